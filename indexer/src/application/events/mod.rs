pub mod bus;
pub mod dispatcher;
pub mod types;

pub use bus::{EventBus, EventReceiver};
pub use dispatcher::EventDispatcher;
pub use types::PipelineEvent;
