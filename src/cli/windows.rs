//! Windows command implementation

use crate::config::Config;
use crate::optimize::generate_windows;
use chrono::NaiveDate;
use clap::Args;

#[derive(Args, Debug)]
pub struct WindowsArgs {
    /// First date of the sample (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last date of the sample (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,

    /// Override train window length
    #[arg(long)]
    pub train_months: Option<u32>,

    /// Override test window length
    #[arg(long)]
    pub test_months: Option<u32>,

    /// Override step between windows
    #[arg(long)]
    pub step_months: Option<u32>,
}

impl WindowsArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut wf = config.walk_forward.clone();
        wf.train_months = self.train_months.unwrap_or(wf.train_months);
        wf.test_months = self.test_months.unwrap_or(wf.test_months);
        wf.step_months = self.step_months.unwrap_or(wf.step_months);

        let windows = generate_windows(&wf, self.start, self.end)?;
        println!(
            "Walk-forward windows ({}m train / {}m test / {}m step)",
            wf.train_months, wf.test_months, wf.step_months
        );
        for (i, window) in windows.iter().enumerate() {
            println!("  {:>3}  {}", i + 1, window);
        }
        Ok(())
    }
}
