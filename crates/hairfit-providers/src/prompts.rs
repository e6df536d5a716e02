//! Prompt templates sent to the image-generation providers.

/// Negative prompt for identity-preserving models.
pub const IDENTITY_NEGATIVE_PROMPT: &str = "blurry, bad quality, distorted face";

/// Negative prompt for the Replicate identity model.
pub const REPLICATE_NEGATIVE_PROMPT: &str = "blurry, bad quality, different person";

/// Negative prompt for plain text-to-image refinement.
pub const PORTRAIT_NEGATIVE_PROMPT: &str = "blurry, bad quality, cartoon";

/// Inference steps for text-to-image refinement.
pub const PORTRAIT_INFERENCE_STEPS: u32 = 30;

/// Adapter and controlnet strength for the Replicate identity model.
pub const REPLICATE_IP_ADAPTER_SCALE: f32 = 0.8;
pub const REPLICATE_CONTROLNET_SCALE: f32 = 0.8;

/// Prompt for identity-preserving models (InstantID and friends).
pub fn identity_prompt(style_prompt: &str) -> String {
    format!(
        "person with {}, same face, professional hair salon photo, high quality, detailed",
        style_prompt
    )
}

/// Prompt for the Replicate identity model.
pub fn replicate_prompt(style_prompt: &str) -> String {
    format!(
        "person with {}, same face identity, professional hair salon result",
        style_prompt
    )
}

/// Prompt for text-only portrait models.
pub fn portrait_prompt(style_prompt: &str) -> String {
    format!(
        "portrait photo, {}, professional photography, high quality",
        style_prompt
    )
}

/// Instruction for multimodal editing models that receive both images.
pub fn edit_instruction(style_name: &str, style_prompt: &str) -> String {
    format!(
        "Edit the first image so the person wears the hairstyle shown in the second image \
         ({}: {}). Keep the person's face and identity unchanged and keep the original pose \
         and background. Return one photorealistic image.",
        style_name, style_prompt
    )
}
