pub mod ccad;
pub mod dcad;
pub mod hcad;
pub mod tad;
pub mod tcad;

pub use ccad::CcadConnector;
pub use dcad::DcadConnector;
pub use hcad::HcadConnector;
pub use tad::TadConnector;
pub use tcad::TcadConnector;
