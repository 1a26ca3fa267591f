//! Builds the instruction text sent to the model from the user's fields.
//!
//! Style augmentation lives here and nowhere else, so it is applied exactly
//! once and always before the negative prompt.

use crate::models::{GenerationRequest, ImageStyle, TransformKind, TransformationRequest};

pub fn compose_generation(
    base_prompt: &str,
    style: Option<ImageStyle>,
    negative_prompt: Option<&str>,
) -> String {
    let mut prompt = base_prompt.to_string();
    if let Some(style) = style {
        prompt.push_str(&format!(", in the style of {}", style));
    }
    if let Some(negative) = negative_prompt.filter(|n| !n.is_empty()) {
        prompt.push_str(&format!(". Avoid: {}", negative));
    }
    prompt
}

/// Returns an empty string for an empty instruction; callers treat that as
/// "nothing to do".
pub fn compose_transformation(
    base_instruction: &str,
    kind: TransformKind,
    preservation_strength: u8,
) -> String {
    if base_instruction.is_empty() {
        return String::new();
    }
    let preservation_strength = preservation_strength.min(100);
    match kind {
        TransformKind::StyleTransfer => format!(
            "Apply this style to the image: {}. Preserve approximately {}% of the original content.",
            base_instruction, preservation_strength
        ),
        TransformKind::ContentModification => format!(
            "Modify the content of this image: {}. Preserve approximately {}% of the original content.",
            base_instruction, preservation_strength
        ),
        TransformKind::BackgroundChange => format!(
            "Change the background to: {}. Keep the main subject intact.",
            base_instruction
        ),
    }
}

pub fn generation_prompt(request: &GenerationRequest) -> String {
    compose_generation(
        &request.prompt,
        request.style,
        request.negative_prompt.as_deref(),
    )
}

pub fn transformation_instruction(request: &TransformationRequest) -> String {
    compose_transformation(
        &request.instruction,
        request.transform_kind,
        request.preservation_strength,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prompt_is_unchanged() {
        assert_eq!(
            compose_generation("a red barn in a field", None, None),
            "a red barn in a field"
        );
    }

    #[test]
    fn test_style_is_appended() {
        assert_eq!(
            compose_generation("a red barn", Some(ImageStyle::Watercolor), None),
            "a red barn, in the style of Watercolor"
        );
    }

    #[test]
    fn test_negative_prompt_follows_style() {
        assert_eq!(
            compose_generation(
                "a red barn",
                Some(ImageStyle::PixelArt),
                Some("blurry, extra limbs")
            ),
            "a red barn, in the style of Pixel Art. Avoid: blurry, extra limbs"
        );
        assert_eq!(
            compose_generation("a red barn", None, Some("fog")),
            "a red barn. Avoid: fog"
        );
    }

    #[test]
    fn test_every_style_keeps_prompt_and_names_style() {
        for style in ImageStyle::ALL {
            let composed = compose_generation("lighthouse at dusk", Some(style), Some("people"));
            assert!(composed.contains("lighthouse at dusk"));
            assert!(composed.contains(style.name()));
        }
    }

    #[test]
    fn test_transformation_templates() {
        assert_eq!(
            compose_transformation("apply cubism", TransformKind::StyleTransfer, 30),
            "Apply this style to the image: apply cubism. Preserve approximately 30% of the original content."
        );
        assert_eq!(
            compose_transformation("add a hat", TransformKind::ContentModification, 80),
            "Modify the content of this image: add a hat. Preserve approximately 80% of the original content."
        );
        assert_eq!(
            compose_transformation("a beach", TransformKind::BackgroundChange, 77),
            "Change the background to: a beach. Keep the main subject intact."
        );
    }

    #[test]
    fn test_strength_above_hundred_is_capped() {
        let mut request = TransformationRequest::new(vec![1], "add snow");
        request.preservation_strength = 250;
        assert_eq!(
            transformation_instruction(&request),
            "Apply this style to the image: add snow. Preserve approximately 100% of the original content."
        );
    }

    #[test]
    fn test_background_change_ignores_strength() {
        for strength in [0u8, 13, 50, 100] {
            let composed = compose_transformation("snow", TransformKind::BackgroundChange, strength);
            assert!(!composed.contains('%'));
            assert!(!composed.contains(&strength.to_string()));
        }
    }

    #[test]
    fn test_empty_instruction_is_a_no_op() {
        for kind in TransformKind::ALL {
            for strength in [0u8, 50, 100] {
                assert_eq!(compose_transformation("", kind, strength), "");
            }
        }
    }

    #[test]
    fn test_request_helpers() {
        let request = GenerationRequest::new("a red barn")
            .with_style(Some(ImageStyle::Sketch))
            .with_negative_prompt(Some("color".into()));
        assert_eq!(
            generation_prompt(&request),
            "a red barn, in the style of Sketch. Avoid: color"
        );

        let request = TransformationRequest::new(vec![0u8; 4], "neon lights")
            .with_kind(TransformKind::ContentModification)
            .with_preservation_strength(10);
        assert_eq!(
            transformation_instruction(&request),
            "Modify the content of this image: neon lights. Preserve approximately 10% of the original content."
        );
    }
}
