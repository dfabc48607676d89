pub mod builders;
pub mod mock_participants;
pub mod mock_transport;
pub mod strategies;

pub use builders::*;
pub use mock_participants::*;
pub use mock_transport::*;
