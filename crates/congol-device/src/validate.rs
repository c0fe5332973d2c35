//! Inspect the error state of the OpenGL context.

use gl::types::GLenum;

/// Readable name for a `glGetError` code.
pub fn error_name(code: GLenum) -> &'static str {
    match code {
        gl::INVALID_ENUM => "GL_INVALID_ENUM",
        gl::INVALID_VALUE => "GL_INVALID_VALUE",
        gl::INVALID_OPERATION => "GL_INVALID_OPERATION",
        gl::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        gl::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        gl::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        gl::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        _ => "unknown GL error",
    }
}

/// Pop every pending GL error, logging each one against `call`.
///
/// Returns the number of errors drained.
///
/// # Safety
///
/// Must be called with a valid OpenGL context current on this thread.
pub unsafe fn drain_errors(call: &str) -> usize {
    let mut drained = 0;
    loop {
        let code = gl::GetError();
        if code == gl::NO_ERROR {
            break;
        }
        tracing::warn!(call, code, error = error_name(code), "GL error");
        drained += 1;
    }
    drained
}
