pub mod engine;
pub mod markup;
pub mod metrics;
pub mod paginate;
pub mod pdf_writer;
pub mod strip;

pub use engine::{LayoutEngine, LayoutEngineLauncher};
pub use markup::{parse, Block, ParsedDocument};
pub use strip::extract_sections;
