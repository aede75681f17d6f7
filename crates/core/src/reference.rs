use crate::PointCloud;

/// Ground-truth cloud a part is inspected against.
///
/// Only shared access is exposed; a new model replaces the old one instead
/// of being edited in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceModel {
    cloud: PointCloud,
}

impl ReferenceModel {
    pub fn new(cloud: PointCloud) -> Self {
        Self { cloud }
    }

    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    pub fn into_cloud(self) -> PointCloud {
        self.cloud
    }
}

impl From<PointCloud> for ReferenceModel {
    fn from(cloud: PointCloud) -> Self {
        Self::new(cloud)
    }
}

impl AsRef<PointCloud> for ReferenceModel {
    fn as_ref(&self) -> &PointCloud {
        &self.cloud
    }
}
