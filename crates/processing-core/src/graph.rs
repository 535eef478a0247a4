//! Filter graph representation, wiring checks, and ffmpeg serialization.
//!
//! A [`FilterGraph`] keeps its audio and video chains apart and names its two
//! terminal outputs explicitly. Graphs are only obtainable through
//! [`FilterGraph::assemble`], which refuses to build anything whose labels do
//! not line up.

use std::collections::HashSet;
use std::fmt;

use collage_common::error::{CollageError, CollageResult};
use collage_edit_model::edit::ClipIndex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Kind of elementary stream a raw input reference selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Audio,
    Video,
}

impl StreamKind {
    fn specifier(self) -> char {
        match self {
            Self::Audio => 'a',
            Self::Video => 'v',
        }
    }
}

/// A pad label: either a raw input stream or a named link between nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// `<input index>:<a|v>`, fed straight from a source file.
    Input { clip: ClipIndex, stream: StreamKind },
    /// An intermediate or terminal link produced by a node.
    Link(String),
}

impl Label {
    pub fn input(clip: ClipIndex, stream: StreamKind) -> Self {
        Self::Input { clip, stream }
    }

    pub fn link(name: impl Into<String>) -> Self {
        Self::Link(name.into())
    }

    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input { .. })
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input { clip, stream } => {
                write!(f, "{}:{}", clip.input_index(), stream.specifier())
            }
            Self::Link(name) => f.write_str(name),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One filter invocation with its input and output pads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterNode {
    pub inputs: Vec<Label>,
    pub operation: String,
    #[serde(serialize_with = "serialize_params")]
    pub params: Vec<(String, String)>,
    pub outputs: Vec<Label>,
}

impl FilterNode {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            inputs: Vec::new(),
            operation: operation.into(),
            params: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, label: Label) -> Self {
        self.inputs.push(label);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn output(mut self, label: Label) -> Self {
        self.outputs.push(label);
        self
    }

    /// Value of the named parameter, if present.
    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `[in]...op=k=v:k=v[out]...`
    pub fn to_filter_string(&self) -> String {
        let mut out = String::new();
        for label in &self.inputs {
            out.push_str(&format!("[{label}]"));
        }
        out.push_str(&self.operation);
        if !self.params.is_empty() {
            let args = self
                .params
                .iter()
                .map(|(k, v)| format!("{k}={}", quote_value(v)))
                .collect::<Vec<_>>()
                .join(":");
            out.push('=');
            out.push_str(&args);
        }
        for label in &self.outputs {
            out.push_str(&format!("[{label}]"));
        }
        out
    }
}

fn serialize_params<S: Serializer>(
    params: &[(String, String)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(params.len()))?;
    for (k, v) in params {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

/// Quote a filter argument when it contains filtergraph metacharacters.
fn quote_value(value: &str) -> String {
    let needs_quotes = value.chars().any(|c| {
        matches!(c, ',' | ';' | ':' | '[' | ']' | '\'' | '\\' | '=') || c.is_whitespace()
    });
    if !needs_quotes {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// A compiled graph: audio chain, video chain, and the two terminal labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterGraph {
    audio_chain: Vec<FilterNode>,
    video_chain: Vec<FilterNode>,
    audio_out: Label,
    video_out: Label,
}

impl FilterGraph {
    /// Build a graph from its parts, failing with `CompilationInvariant` if
    /// the wiring is inconsistent.
    pub fn assemble(
        audio_chain: Vec<FilterNode>,
        video_chain: Vec<FilterNode>,
        audio_out: Label,
        video_out: Label,
    ) -> CollageResult<Self> {
        let graph = Self {
            audio_chain,
            video_chain,
            audio_out,
            video_out,
        };
        graph.verify()?;
        Ok(graph)
    }

    pub fn audio_chain(&self) -> &[FilterNode] {
        &self.audio_chain
    }

    pub fn video_chain(&self) -> &[FilterNode] {
        &self.video_chain
    }

    /// Terminal label carrying the mixed audio.
    pub fn audio_out(&self) -> &Label {
        &self.audio_out
    }

    /// Terminal label carrying the composed video.
    pub fn video_out(&self) -> &Label {
        &self.video_out
    }

    /// All nodes in execution order: audio chain, then video chain.
    pub fn nodes(&self) -> impl Iterator<Item = &FilterNode> {
        self.audio_chain.iter().chain(self.video_chain.iter())
    }

    pub fn node_count(&self) -> usize {
        self.audio_chain.len() + self.video_chain.len()
    }

    /// Nodes running the given filter.
    pub fn nodes_with_operation<'a>(
        &'a self,
        operation: &'a str,
    ) -> impl Iterator<Item = &'a FilterNode> + 'a {
        self.nodes().filter(move |node| node.operation == operation)
    }

    /// Labels produced by some node and never consumed afterwards.
    pub fn terminal_outputs(&self) -> Vec<&Label> {
        let consumed: HashSet<&Label> = self.nodes().flat_map(|n| n.inputs.iter()).collect();
        self.nodes()
            .flat_map(|n| n.outputs.iter())
            .filter(|label| !consumed.contains(label))
            .collect()
    }

    /// Serialize into ffmpeg's `-filter_complex` syntax.
    pub fn to_filter_complex(&self) -> String {
        self.nodes()
            .map(FilterNode::to_filter_string)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Check the wiring rules:
    /// - every node names an operation and produces at least one link
    /// - link names are well-formed and produced exactly once
    /// - a link is consumed at most once, and only after it was produced
    /// - exactly two links stay unconsumed: `audio_out` (from the audio
    ///   chain) and `video_out` (from the video chain)
    pub fn verify(&self) -> CollageResult<()> {
        let mut produced: HashSet<&Label> = HashSet::new();
        let mut open: HashSet<&Label> = HashSet::new();

        for node in self.nodes() {
            if node.operation.is_empty() {
                return Err(CollageError::compilation_invariant(
                    "node without an operation",
                ));
            }
            if node.outputs.is_empty() {
                return Err(CollageError::compilation_invariant(format!(
                    "{} node produces no output",
                    node.operation
                )));
            }

            for label in &node.inputs {
                if label.is_input() {
                    continue;
                }
                if !open.remove(label) {
                    let reason = if produced.contains(label) {
                        "consumed twice"
                    } else {
                        "consumed before it was produced"
                    };
                    return Err(CollageError::compilation_invariant(format!(
                        "label {label} {reason} (by {})",
                        node.operation
                    )));
                }
            }

            for label in &node.outputs {
                match label {
                    Label::Input { .. } => {
                        return Err(CollageError::compilation_invariant(format!(
                            "{} node writes to raw input {label}",
                            node.operation
                        )));
                    }
                    Label::Link(name) if !is_valid_link_name(name) => {
                        return Err(CollageError::compilation_invariant(format!(
                            "malformed label {name:?}"
                        )));
                    }
                    Label::Link(_) => {}
                }
                if !produced.insert(label) {
                    return Err(CollageError::compilation_invariant(format!(
                        "label {label} produced more than once"
                    )));
                }
                open.insert(label);
            }
        }

        if self.audio_out == self.video_out {
            return Err(CollageError::compilation_invariant(
                "audio and video outputs share a label",
            ));
        }
        let expected: HashSet<&Label> = [&self.audio_out, &self.video_out].into_iter().collect();
        if open != expected {
            let mut dangling: Vec<String> = open.iter().map(|l| l.to_string()).collect();
            dangling.sort();
            return Err(CollageError::compilation_invariant(format!(
                "terminal outputs are [{}], expected [{}, {}]",
                dangling.join(", "),
                self.audio_out,
                self.video_out
            )));
        }

        let produces = |chain: &[FilterNode], label: &Label| {
            chain.iter().any(|n| n.outputs.contains(label))
        };
        if !produces(&self.audio_chain, &self.audio_out) {
            return Err(CollageError::compilation_invariant(format!(
                "audio output {} is not produced by the audio chain",
                self.audio_out
            )));
        }
        if !produces(&self.video_chain, &self.video_out) {
            return Err(CollageError::compilation_invariant(format!(
                "video output {} is not produced by the video chain",
                self.video_out
            )));
        }

        Ok(())
    }
}

fn is_valid_link_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio_in() -> Label {
        Label::input(ClipIndex::First, StreamKind::Audio)
    }

    fn video_in() -> Label {
        Label::input(ClipIndex::Second, StreamKind::Video)
    }

    fn minimal_parts() -> (Vec<FilterNode>, Vec<FilterNode>) {
        let audio = vec![FilterNode::new("anull")
            .input(audio_in())
            .output(Label::link("aout"))];
        let video = vec![FilterNode::new("null")
            .input(video_in())
            .output(Label::link("vout"))];
        (audio, video)
    }

    #[test]
    fn test_node_serialization_quotes_expressions() {
        let node = FilterNode::new("crop")
            .input(Label::link("c0_vpts"))
            .param("w", "min(iw,ih*16/9)")
            .param("x", "(iw-ow)/2")
            .output(Label::link("c0_crop"));
        assert_eq!(
            node.to_filter_string(),
            "[c0_vpts]crop=w='min(iw,ih*16/9)':x=(iw-ow)/2[c0_crop]"
        );
    }

    #[test]
    fn test_quote_value_escapes_single_quotes() {
        assert_eq!(quote_value("plain"), "plain");
        assert_eq!(quote_value("1 1"), "'1 1'");
        assert_eq!(quote_value("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_raw_input_labels_render_as_stream_specifiers() {
        assert_eq!(audio_in().to_string(), "0:a");
        assert_eq!(video_in().to_string(), "1:v");
    }

    #[test]
    fn test_minimal_graph_assembles() {
        let (audio, video) = minimal_parts();
        let graph =
            FilterGraph::assemble(audio, video, Label::link("aout"), Label::link("vout")).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.terminal_outputs().len(), 2);
        assert_eq!(graph.to_filter_complex(), "[0:a]anull[aout];[1:v]null[vout]");
    }

    #[test]
    fn test_use_before_definition_is_invariant_violation() {
        let (mut audio, video) = minimal_parts();
        audio.insert(
            0,
            FilterNode::new("volume")
                .input(Label::link("later"))
                .output(Label::link("early")),
        );
        let err = FilterGraph::assemble(audio, video, Label::link("aout"), Label::link("vout"))
            .unwrap_err();
        assert!(matches!(err, CollageError::CompilationInvariant { .. }));
        assert!(err.to_string().contains("before it was produced"));
    }

    #[test]
    fn test_label_collision_is_invariant_violation() {
        let (mut audio, video) = minimal_parts();
        audio.push(
            FilterNode::new("anull")
                .input(Label::input(ClipIndex::Second, StreamKind::Audio))
                .output(Label::link("aout")),
        );
        let err = FilterGraph::assemble(audio, video, Label::link("aout"), Label::link("vout"))
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_dangling_output_is_invariant_violation() {
        let (mut audio, video) = minimal_parts();
        audio.push(
            FilterNode::new("anull")
                .input(Label::input(ClipIndex::Second, StreamKind::Audio))
                .output(Label::link("stray")),
        );
        let err = FilterGraph::assemble(audio, video, Label::link("aout"), Label::link("vout"))
            .unwrap_err();
        assert!(err.to_string().contains("stray"));
    }

    #[test]
    fn test_double_consumption_is_invariant_violation() {
        let audio = vec![
            FilterNode::new("anull")
                .input(audio_in())
                .output(Label::link("a0")),
            FilterNode::new("anull")
                .input(Label::link("a0"))
                .output(Label::link("aout")),
            FilterNode::new("anull")
                .input(Label::link("a0"))
                .output(Label::link("a2")),
        ];
        let (_, video) = minimal_parts();
        let err = FilterGraph::assemble(audio, video, Label::link("aout"), Label::link("vout"))
            .unwrap_err();
        assert!(err.to_string().contains("consumed twice"));
    }

    #[test]
    fn test_outputs_must_come_from_their_own_chain() {
        let (audio, video) = minimal_parts();
        let err = FilterGraph::assemble(video, audio, Label::link("aout"), Label::link("vout"))
            .unwrap_err();
        assert!(err.to_string().contains("not produced by the audio chain"));
    }

    #[test]
    fn test_malformed_link_name_rejected() {
        let audio = vec![FilterNode::new("anull")
            .input(audio_in())
            .output(Label::link("a out"))];
        let (_, video) = minimal_parts();
        let err = FilterGraph::assemble(audio, video, Label::link("a out"), Label::link("vout"))
            .unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn test_json_shape() {
        let (audio, video) = minimal_parts();
        let graph =
            FilterGraph::assemble(audio, video, Label::link("aout"), Label::link("vout")).unwrap();
        let value = serde_json::to_value(&graph).unwrap();
        assert_eq!(value["audio_out"], "aout");
        assert_eq!(value["video_chain"][0]["inputs"][0], "1:v");
        assert!(value["video_chain"][0]["params"].is_object());
    }
}
