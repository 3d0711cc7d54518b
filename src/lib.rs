pub mod constants;
pub mod errors;
pub mod managers;
pub mod model;
pub mod services;
pub mod stores;
pub mod utils;

pub use errors::{InvokeError, InvokeErrorKind};
pub use managers::auth::{
    AuthResolution, AuthResolver, HttpTokenRefresher, ProviderConfig, TokenRefresher, TokenStore,
};
pub use managers::invoker::{Invoker, InvokerConfig};
pub use model::{CallResult, ParameterSpec, TokenRecord, ToolDescriptor};
pub use stores::file_token_store::FileTokenStore;
pub use stores::memory_token_store::MemoryTokenStore;
