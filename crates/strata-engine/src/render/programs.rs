//! Program kinds used by brushes and output effects.

use crate::gpu::{ProgramDesc, Shading};

pub static SOLID_COLOR: ProgramDesc = ProgramDesc {
    label: "solid color",
    source: include_str!("shaders/solid_color.wgsl"),
    shading: Shading::Uniform,
};

pub static COLOR_TUNE: ProgramDesc = ProgramDesc {
    label: "color tune",
    source: include_str!("shaders/color_tune.wgsl"),
    shading: Shading::SampledTinted,
};

pub static PASS_THROUGH: ProgramDesc = ProgramDesc {
    label: "pass through",
    source: include_str!("shaders/pass_through.wgsl"),
    shading: Shading::Sampled,
};
