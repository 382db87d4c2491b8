pub mod ride_controller;
