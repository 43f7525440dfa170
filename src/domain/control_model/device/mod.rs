pub mod loopback_transmitter;
