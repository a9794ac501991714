pub mod driver;

pub use driver::WebPage;
