pub mod error;
pub mod exclusion;
pub mod hydro_year;
pub mod record;
pub mod series;
pub mod window;
