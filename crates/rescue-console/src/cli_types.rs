use clap::ValueEnum;

use rescue_advisory::ChangeScope;
use rescue_ai::AdvisoryRoute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliAdvisoryRoute {
    Proxy,
    Provider,
}

impl From<CliAdvisoryRoute> for AdvisoryRoute {
    fn from(value: CliAdvisoryRoute) -> Self {
        match value {
            CliAdvisoryRoute::Proxy => Self::Proxy,
            CliAdvisoryRoute::Provider => Self::Provider,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliChangeScope {
    Full,
    Operational,
}

impl From<CliChangeScope> for ChangeScope {
    fn from(value: CliChangeScope) -> Self {
        match value {
            CliChangeScope::Full => Self::Full,
            CliChangeScope::Operational => Self::Operational,
        }
    }
}
