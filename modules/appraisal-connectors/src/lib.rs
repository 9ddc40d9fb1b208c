pub mod connector;
pub mod districts;
pub mod error;
pub mod factory;
pub mod open_data;
pub mod page_text;
pub mod renderer;
pub mod testing;

pub use connector::{ConnectorExt, DistrictConnector};
pub use error::{ConnectorError, Result};
pub use factory::ConnectorFactory;
pub use open_data::{OpenDataSource, SocrataSource};
pub use renderer::{BrowserlessRenderer, NoRenderer, PageCapture, PageRenderer};
