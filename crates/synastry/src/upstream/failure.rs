//! User-facing failure states. Nothing here carries internal detail.

use super::client::RetrievalError;
use crate::share::InvalidLinkError;
use serde::Serialize;

const SEALED_TITLE: &str = "The Vault is sealed";
const GENERIC_MESSAGE: &str = "Something went wrong while loading the report.";
const BROKEN_LINK_TITLE: &str = "This link is broken";
const BROKEN_LINK_MESSAGE: &str =
    "The shared report link could not be read. Start a new reading from the home page.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Config,
    UpstreamHttp,
    UpstreamShape,
    Network,
    InvalidLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    Retry,
    GoHome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureView {
    pub kind: FailureKind,
    pub title: String,
    pub message: String,
    pub action: FailureAction,
    pub status: u16,
}

impl FailureView {
    fn sealed(kind: FailureKind, action: FailureAction, status: u16) -> Self {
        Self {
            kind,
            title: SEALED_TITLE.to_string(),
            message: GENERIC_MESSAGE.to_string(),
            action,
            status,
        }
    }
}

impl From<&RetrievalError> for FailureView {
    fn from(error: &RetrievalError) -> Self {
        let status = error.status();
        match error {
            RetrievalError::Config => Self::sealed(FailureKind::Config, FailureAction::GoHome, status),
            RetrievalError::UpstreamHttp { .. } => {
                Self::sealed(FailureKind::UpstreamHttp, FailureAction::Retry, status)
            }
            RetrievalError::UpstreamShape(_) => {
                Self::sealed(FailureKind::UpstreamShape, FailureAction::Retry, status)
            }
            RetrievalError::Network(_) => {
                Self::sealed(FailureKind::Network, FailureAction::Retry, status)
            }
        }
    }
}

impl From<&InvalidLinkError> for FailureView {
    fn from(_: &InvalidLinkError) -> Self {
        Self {
            kind: FailureKind::InvalidLink,
            title: BROKEN_LINK_TITLE.to_string(),
            message: BROKEN_LINK_MESSAGE.to_string(),
            action: FailureAction::GoHome,
            status: 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_offer_retry_and_keep_status() {
        let view = FailureView::from(&RetrievalError::UpstreamHttp {
            status: 503,
            body: "internal trace: key=secret".to_string(),
        });
        assert_eq!(view.action, FailureAction::Retry);
        assert_eq!(view.status, 503);
        assert_eq!(view.message, GENERIC_MESSAGE);
        assert!(!serde_json::to_string(&view)
            .expect("serializes")
            .contains("secret"));
    }

    #[test]
    fn network_and_config_failures_stay_generic() {
        let network = FailureView::from(&RetrievalError::Network("dns".to_string()));
        assert_eq!(network.kind, FailureKind::Network);
        assert_eq!(network.status, 502);

        let config = FailureView::from(&RetrievalError::Config);
        assert_eq!(config.action, FailureAction::GoHome);
        assert_eq!(config.status, 500);
        assert_eq!(config.message, GENERIC_MESSAGE);
    }

    #[test]
    fn broken_links_send_users_home() {
        let view = FailureView::from(&InvalidLinkError::Missing);
        assert_eq!(view.kind, FailureKind::InvalidLink);
        assert_eq!(view.action, FailureAction::GoHome);
        assert_eq!(view.status, 400);
        let json = serde_json::to_value(&view).expect("serializes");
        assert_eq!(json["action"], "go_home");
    }
}
