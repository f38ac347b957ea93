//! Compile-time names for pipes.
//!
//! A pipe is identified by a zero-sized tag type. The tag never exists at run
//! time; it only picks the `NAME` used in logs and errors, and keeps two pipes
//! carrying the same element type from being swapped by accident.

/// Name attached to a pipe tag.
pub trait PipeName: 'static {
    /// Stable name used in diagnostics.
    const NAME: &'static str;
}

/// Declares uninhabited tag types implementing [`PipeName`].
///
/// ```
/// csr_pipes::declare_pipes!(IdInput, IdOutput);
/// use csr_pipes::ids::PipeName;
/// assert_eq!(IdInput::NAME, "IdInput");
/// ```
#[macro_export]
macro_rules! declare_pipes {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Debug)]
            pub enum $name {}

            impl $crate::ids::PipeName for $name {
                const NAME: &'static str = stringify!($name);
            }
        )+
    };
}
