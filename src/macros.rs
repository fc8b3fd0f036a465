/// A `&'static Regex` compiled once, on first use.
///
/// Patterns are literals, so a failure to compile is a bug in this crate.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Parse feature notation against a system, propagating errors with `?`.
///
/// ```
/// # use phonomorph::{fs, FeatureSystem, FeatureError};
/// # fn main() -> Result<(), FeatureError> {
/// let sys = FeatureSystem::builder().binary("cons").binary("voice").build()?;
/// let voiceless = fs!(sys, "+cons -voice");
/// assert_eq!(voiceless.len(), 2);
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! fs {
    ($system:expr, $notation:expr) => {
        $system.parse($notation)?
    };
}
