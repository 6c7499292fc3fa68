pub mod alerts;
pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod labels;
pub mod listener;
pub mod processor;
pub mod state;
pub mod storage;
pub mod subscribe;


pub use api::{AlloyChainApi, ChainApi};
pub use events::{ChainEvent, DisconnectedRange, EventData, EventKind, RawEvent};
pub use handlers::{EventHandler, HandlerChain};
pub use listener::Subscriber;
pub use processor::Processor;
pub use storage::StorageFetcher;
pub use subscribe::{create_api, subscribe_events, SubscribeOptions};
