pub mod audit;
pub mod bridge;
pub mod gateway;
pub mod role_manager;
pub mod status;

pub use audit::{AuditRecord, REASON_RECAPTCHA_FAILED};
pub use bridge::{
    bridge_channel, create_shared_bridge_handle, run_bridge, BridgeTask, SharedBridgeHandle,
};
pub use gateway::SerenityGateway;
pub use role_manager::run_fallback_verification;
pub use status::run_status_reporter;
