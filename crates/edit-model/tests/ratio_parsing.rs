use collage_edit_model::ratio::AspectRatio;
use proptest::prelude::*;

proptest! {
    #[test]
    fn positive_terms_parse_back_to_themselves(w in 1u32..=100_000, h in 1u32..=100_000) {
        let text = format!("{w}:{h}");
        let ratio: AspectRatio = text.parse().unwrap();
        prop_assert_eq!(ratio.width(), w);
        prop_assert_eq!(ratio.height(), h);
        prop_assert_eq!(ratio.to_string(), text);
        prop_assert!(ratio.as_f64() > 0.0 && ratio.as_f64().is_finite());
    }

    #[test]
    fn negative_terms_never_parse(w in 1i64..=10_000, h in 1i64..=10_000) {
        let left = format!("-{w}:{h}").parse::<AspectRatio>();
        let right = format!("{w}:-{h}").parse::<AspectRatio>();
        prop_assert!(left.is_err());
        prop_assert!(right.is_err());
    }

    #[test]
    fn arbitrary_text_never_panics(text in "\\PC{0,16}") {
        if let Ok(ratio) = text.parse::<AspectRatio>() {
            prop_assert!(ratio.width() > 0 && ratio.height() > 0);
        }
    }
}

#[test]
fn zero_terms_are_rejected() {
    assert!("0:0".parse::<AspectRatio>().is_err());
    assert!("00:1".parse::<AspectRatio>().is_err());
}
