pub mod analytics;
pub mod masters;
pub mod notifier;
pub mod signals;
pub mod subscriptions;

pub use masters::MasterService;
pub use notifier::Notifier;
pub use signals::SignalService;
pub use subscriptions::SubscriptionService;
