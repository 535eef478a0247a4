//! Filter graph compiler.
//!
//! Per clip, in clip order:
//!
//! ```text
//! audio: [n:a] atrim -> asetpts -> volume -> equalizer* ──┐
//!                                                          ├─ amix ──> [aout]
//! audio: [m:a] atrim -> asetpts -> volume -> equalizer* ──┘
//!
//! video: [n:v] trim -> setpts -> crop -> setsar -> scale ──┐
//!                                    color ─> overlay ─────┴─> overlay ──> [vout]
//! video: [m:v] trim -> setpts -> crop -> setsar -> scale ──────────┘
//! ```
//!
//! Link labels follow `c{input}_{stage}{ordinal}`; only equalizer stages
//! carry an ordinal, counted over the bands that are actually emitted.

use collage_common::error::CollageResult;
use collage_edit_model::edit::{ClipEdit, ClipIndex, EditSpec, EqBand};
use serde::Serialize;

use crate::geometry::{resolve, FrameRect, Layout};
use crate::graph::{FilterGraph, FilterNode, Label, StreamKind};
use crate::numeric::format_number;

/// Quality factor of every peaking band.
pub const EQ_Q: f64 = 1.41;

/// Canvas fill colour.
pub const BACKGROUND_COLOR: &str = "black";

/// Frame rate of the generated canvas, which drives the composed output.
pub const CANVAS_FRAME_RATE: u32 = 30;

/// Terminal label of the composed video.
pub const VIDEO_OUT: &str = "vout";

/// Terminal label of the mixed audio.
pub const AUDIO_OUT: &str = "aout";

const RESET_TIMESTAMPS: &str = "PTS-STARTPTS";

/// Layout plus graph for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollagePlan {
    pub layout: Layout,
    pub graph: FilterGraph,
    /// Length of the longer trimmed clip, in seconds.
    pub duration_secs: f64,
}

/// Validate an edit request, resolve its layout, and compile its graph.
pub fn compile_spec(spec: &EditSpec) -> CollageResult<CollagePlan> {
    spec.validate()?;
    let layout = resolve(
        &spec.first.aspect_ratio,
        &spec.second.aspect_ratio,
        spec.layout,
    )?;
    let graph = compile(&layout, &spec.first, &spec.second)?;
    Ok(CollagePlan {
        layout,
        graph,
        duration_secs: spec.longest_duration_secs(),
    })
}

/// Compile both clips against a resolved layout.
///
/// Both clips are validated before any node is built, so a bad request never
/// yields a partial graph.
pub fn compile(
    layout: &Layout,
    first: &ClipEdit,
    second: &ClipEdit,
) -> CollageResult<FilterGraph> {
    first.validate(ClipIndex::First)?;
    second.validate(ClipIndex::Second)?;
    let clips = [(ClipIndex::First, first), (ClipIndex::Second, second)];

    let audio_chains: Vec<Chain> = clips
        .iter()
        .map(|&(index, edit)| audio_chain(index, edit))
        .collect();
    let video_chains: Vec<Chain> = clips
        .iter()
        .map(|&(index, edit)| video_chain(index, edit, layout.frame(index)))
        .collect();

    let audio_out = Label::link(AUDIO_OUT);
    let mix = audio_chains
        .iter()
        .fold(FilterNode::new("amix"), |node, chain| {
            node.input(chain.tail.clone())
        })
        .param("inputs", audio_chains.len().to_string())
        .param("duration", "longest")
        .param("dropout_transition", "0")
        .param("weights", vec!["1"; audio_chains.len()].join(" "))
        .output(audio_out.clone());

    let duration = first.duration_secs().max(second.duration_secs());
    let (canvas, video_out) = composite(layout, duration, &video_chains);

    let elided: usize = clips
        .iter()
        .map(|(_, edit)| edit.equalizer.iter().filter(|b| b.is_flat()).count())
        .sum();

    let mut audio_nodes: Vec<FilterNode> =
        audio_chains.into_iter().flat_map(|c| c.nodes).collect();
    audio_nodes.push(mix);
    let mut video_nodes: Vec<FilterNode> =
        video_chains.into_iter().flat_map(|c| c.nodes).collect();
    video_nodes.extend(canvas);

    let graph = FilterGraph::assemble(audio_nodes, video_nodes, audio_out, video_out)?;

    tracing::debug!(
        audio_nodes = graph.audio_chain().len(),
        video_nodes = graph.video_chain().len(),
        elided_bands = elided,
        canvas_width = layout.canvas_width,
        canvas_height = layout.canvas_height,
        "Filter graph compiled"
    );

    Ok(graph)
}

/// A linear run of nodes and the label its last node writes.
#[derive(Debug, Clone)]
struct Chain {
    nodes: Vec<FilterNode>,
    tail: Label,
}

impl Chain {
    fn from_input(clip: ClipIndex, stream: StreamKind) -> Self {
        Self {
            nodes: Vec::new(),
            tail: Label::input(clip, stream),
        }
    }

    /// Append `node`, fed by the current tail and writing to `output`.
    fn then(mut self, node: FilterNode, output: Label) -> Self {
        let input = std::mem::replace(&mut self.tail, output.clone());
        self.nodes.push(node.input(input).output(output));
        self
    }
}

fn stage(clip: ClipIndex, name: &str) -> Label {
    Label::link(format!("c{}_{name}", clip.input_index()))
}

fn ordinal_stage(clip: ClipIndex, name: &str, ordinal: usize) -> Label {
    Label::link(format!("c{}_{name}{ordinal}", clip.input_index()))
}

/// Start/end arguments shared verbatim by the audio and video trims.
fn trim_window(edit: &ClipEdit) -> [(&'static str, String); 2] {
    [
        ("start", format_number(edit.start_time)),
        ("end", format_number(edit.end_time)),
    ]
}

fn with_params(
    mut node: FilterNode,
    params: impl IntoIterator<Item = (&'static str, String)>,
) -> FilterNode {
    for (key, value) in params {
        node = node.param(key, value);
    }
    node
}

fn audio_chain(clip: ClipIndex, edit: &ClipEdit) -> Chain {
    let base = Chain::from_input(clip, StreamKind::Audio)
        .then(
            with_params(FilterNode::new("atrim"), trim_window(edit)),
            stage(clip, "atrim"),
        )
        .then(
            FilterNode::new("asetpts").param("expr", RESET_TIMESTAMPS),
            stage(clip, "apts"),
        )
        .then(
            FilterNode::new("volume").param("volume", format_number(edit.volume)),
            stage(clip, "vol"),
        );

    edit.active_bands()
        .enumerate()
        .fold(base, |chain, (ordinal, band)| {
            chain.then(peaking_band(band), ordinal_stage(clip, "eq", ordinal))
        })
}

fn peaking_band(band: &EqBand) -> FilterNode {
    FilterNode::new("equalizer")
        .param("f", format_number(band.frequency_hz))
        .param("t", "q")
        .param("w", format_number(EQ_Q))
        .param("g", format_number(band.gain_db))
}

fn video_chain(clip: ClipIndex, edit: &ClipEdit, frame: &FrameRect) -> Chain {
    let ratio_w = edit.aspect_ratio.width();
    let ratio_h = edit.aspect_ratio.height();

    Chain::from_input(clip, StreamKind::Video)
        .then(
            with_params(FilterNode::new("trim"), trim_window(edit)),
            stage(clip, "vtrim"),
        )
        .then(
            FilterNode::new("setpts").param("expr", RESET_TIMESTAMPS),
            stage(clip, "vpts"),
        )
        .then(
            FilterNode::new("crop")
                .param("w", format!("min(iw,ih*{ratio_w}/{ratio_h})"))
                .param("h", format!("min(ih,iw*{ratio_h}/{ratio_w})"))
                .param("x", "(iw-ow)/2")
                .param("y", "(ih-oh)/2"),
            stage(clip, "crop"),
        )
        .then(FilterNode::new("setsar").param("sar", "1"), stage(clip, "sar"))
        .then(
            FilterNode::new("scale")
                .param("w", frame.width.to_string())
                .param("h", frame.height.to_string()),
            stage(clip, "scale"),
        )
}

/// Background canvas plus one overlay per clip, in clip order.
fn composite(layout: &Layout, duration_secs: f64, clips: &[Chain]) -> (Vec<FilterNode>, Label) {
    let background = Label::link("bg");
    let canvas = FilterNode::new("color")
        .param("c", BACKGROUND_COLOR)
        .param(
            "s",
            format!("{}x{}", layout.canvas_width, layout.canvas_height),
        )
        .param("r", CANVAS_FRAME_RATE.to_string())
        .param("d", format_number(duration_secs))
        .output(background.clone());

    let last = clips.len().saturating_sub(1);
    let (nodes, tail) = ClipIndex::ALL.iter().zip(clips).enumerate().fold(
        (vec![canvas], background),
        |(mut nodes, base), (position, (&clip, chain))| {
            let frame = layout.frame(clip);
            let output = if position == last {
                Label::link(VIDEO_OUT)
            } else {
                Label::link(format!("ov{position}"))
            };
            nodes.push(
                FilterNode::new("overlay")
                    .input(base)
                    .input(chain.tail.clone())
                    .param("x", frame.x.to_string())
                    .param("y", frame.y.to_string())
                    .output(output.clone()),
            );
            (nodes, output)
        },
    );

    (nodes, tail)
}
