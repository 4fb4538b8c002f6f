mod results;
mod upload_section;
mod utils;

pub use results::{render_report_banner, render_results};
pub use upload_section::render_upload_section;
pub use utils::{meter, render_error_message};
