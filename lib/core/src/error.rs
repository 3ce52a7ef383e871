//! Error handling foundation for the SEED portal.
//!
//! Only the `Result` alias lives here. Each crate owns its domain error
//! enums and wraps them in a rootcause `Report`, attaching further context
//! with `.context()` when an error crosses from one layer into the next
//! (backend call, session manager, binary).

use rootcause::Report;

/// Result alias carrying a rootcause `Report` over a typed context.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn result_alias_carries_typed_context() {
        let failed: Result<(), Boom> = Err(Boom.into());
        let report = failed.expect_err("should be an error");
        assert!(report.to_string().contains("boom"));
    }
}
