pub mod extension;
pub mod instance;
pub mod manager;

pub use extension::{Extension, ExtensionContext, ExtensionId, ExtensionRegistry};
pub use instance::{BotInstance, LargeBot, SmallBot};
pub use manager::{BotLifecycleManager, DefaultInstanceFactory, InstanceFactory};
