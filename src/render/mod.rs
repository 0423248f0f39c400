pub mod leaflet;
pub mod popup;
