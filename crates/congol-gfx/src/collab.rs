//! Collaborators handed to shapes by the application: the shader program and
//! the camera. The resource layer only reads from them.

use congol_device::GLuint;

/// A linked shader program, used to resolve vertex attribute names.
///
/// Compiling, linking and uniform management live outside this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ShaderProgram(GLuint);

impl ShaderProgram {
    /// Wrap the name of a program linked elsewhere.
    pub const fn new(id: GLuint) -> Self {
        Self(id)
    }

    /// GL program name, as passed to `glGetAttribLocation`.
    pub fn id(self) -> GLuint {
        self.0
    }
}

/// View state owned by the windowing layer.
///
/// Shapes only ask it for the time elapsed since the previous frame.
pub trait Camera {
    /// Seconds since the previous frame.
    fn delta_time(&self) -> f32;
}

/// Camera with a constant frame time, for headless use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStepCamera {
    pub step: f32,
}

impl FixedStepCamera {
    pub fn new(step: f32) -> Self {
        Self { step }
    }
}

impl Default for FixedStepCamera {
    fn default() -> Self {
        Self { step: 1.0 / 60.0 }
    }
}

impl Camera for FixedStepCamera {
    fn delta_time(&self) -> f32 {
        self.step
    }
}
