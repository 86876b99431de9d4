//! Prints the Network CRD as YAML.

use crds::Network;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&Network::crd())?);
    Ok(())
}
