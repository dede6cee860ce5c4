//! AzureStackHCIMachine resource and persistence of its annotation bookkeeping
//!
//! Related crates:
//! - `hci-common`: annotation accessors, errors, retry and kube helpers

pub mod controller;
pub mod crd;

pub use controller::{
    machine_annotation_json, update_machine_annotation, update_machine_annotation_json,
    update_machine_annotation_json_as, Context, MachineClient, MachineClientImpl,
};
pub use crd::{
    AzureStackHCIMachine, AzureStackHCIMachineSpec, AzureStackHCIMachineStatus,
    LAST_APPLIED_TAGS_ANNOTATION, VM_STATE_ANNOTATION,
};

// Re-export common error types
pub use hci_common::{Error, Result};
