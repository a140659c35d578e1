//! Read-only datasets bundled with the app.

mod clusters;
mod stops;

use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::DatasetError;

pub use clusters::{
    rescore, score_color, scoring, ClusterCatalog, ClusterCircle, CoreValues, RawCentroid,
    RawCluster, TopologyMetrics, MIN_CLUSTER_RADIUS_METERS,
};
pub use stops::{ConnectedStop, Connection, Stop, StopDetail, StopDirectory};

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
