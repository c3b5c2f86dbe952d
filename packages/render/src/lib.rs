mod printer;
pub use printer::*;
mod text;
pub use text::*;
mod yaml;
pub use yaml::*;
