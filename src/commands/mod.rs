pub mod chains;
pub mod execute;
pub mod history;
pub mod plan;
pub mod track;
