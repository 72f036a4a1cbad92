use crate::cli::utils::output_lines;
use crate::cli::OutputFormat;
use crate::services::passcode;

pub fn handle(count: usize, output_format: OutputFormat) -> anyhow::Result<()> {
    let codes: Vec<String> = (0..count.max(1)).map(|_| passcode::generate()).collect();
    output_lines(&output_format, &codes)
}
