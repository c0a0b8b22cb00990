pub mod openweather;

pub use openweather::OpenWeatherSource;
