pub mod audit_recorder;
