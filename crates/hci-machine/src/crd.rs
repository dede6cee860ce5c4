//! AzureStackHCIMachine CRD
//!
//! Infrastructure machine backing a Cluster API `Machine` on Azure Stack HCI.
//! Provider bookkeeping that has no field here is stored in annotations, see
//! the key constants below.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annotation holding the JSON object of tags last applied to the VM.
///
/// Diffed against the desired tags on each reconcile so removed tags can be
/// cleaned up.
pub const LAST_APPLIED_TAGS_ANNOTATION: &str =
    "infrastructure.cluster.x-k8s.io/azurestackhci-last-applied-tags";

/// Annotation holding the JSON object describing the backing VM
pub const VM_STATE_ANNOTATION: &str = "infrastructure.cluster.x-k8s.io/azurestackhci-vm-state";

/// Spec for an AzureStackHCIMachine
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1alpha4",
    kind = "AzureStackHCIMachine",
    plural = "azurestackhcimachines",
    shortname = "ashcim",
    namespaced,
    status = "AzureStackHCIMachineStatus",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.vmState"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AzureStackHCIMachineSpec {
    /// Provider ID of the VM, set once it exists
    #[serde(rename = "providerID", default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// VM size (e.g., "Default", "Standard_K8S_v1")
    pub vm_size: String,

    /// OS image to boot from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,

    /// Location the VM is placed in
    #[serde(default)]
    pub location: String,

    /// SSH public key injected into the VM
    #[serde(default)]
    pub ssh_public_key: String,

    /// Availability zone, if the platform exposes zones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
}

/// OS image reference
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Image name
    pub name: String,
    /// OS type (Linux or Windows)
    #[serde(default)]
    pub os_type: OsType,
}

/// Guest operating system family
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum OsType {
    /// Linux guest
    #[default]
    Linux,
    /// Windows guest
    Windows,
}

/// Lifecycle state reported for the backing VM
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum VmState {
    /// VM is being created
    Creating,
    /// VM exists and is running
    Succeeded,
    /// VM is being deleted
    Deleting,
    /// VM provisioning failed
    Failed,
}

/// A network address of the VM
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineAddress {
    /// Address type (e.g., "InternalIP", "Hostname")
    #[serde(rename = "type")]
    pub type_: String,
    /// The address itself
    pub address: String,
}

/// Status for an AzureStackHCIMachine
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureStackHCIMachineStatus {
    /// True once the VM is running and addresses are known
    #[serde(default)]
    pub ready: bool,

    /// State of the backing VM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_state: Option<VmState>,

    /// Addresses assigned to the VM
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<MachineAddress>,

    /// Machine-readable reason for a terminal failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Human-readable description of a terminal failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}
