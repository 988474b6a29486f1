#![deny(warnings)]
pub mod knowledge;
pub mod model;
pub mod prob;
pub mod solver;

pub struct EngineInfo;

impl EngineInfo {
    pub const fn name() -> &'static str {
        "cluedo-core"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::EngineInfo;

    #[test]
    fn exposes_static_metadata() {
        assert_eq!(EngineInfo::name(), "cluedo-core");
        assert!(!EngineInfo::version().is_empty());
    }
}
