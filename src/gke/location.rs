/// GKE resource paths for a project location
use std::fmt;

/// Where a control plane runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Zone(String),
    Region(String),
}

impl Location {
    /// Resolve a location from zone/region inputs; exactly one must be set and non-empty
    pub fn from_parts(zone: Option<&str>, region: Option<&str>) -> Result<Self, LocationError> {
        let zone = zone.filter(|z| !z.is_empty());
        let region = region.filter(|r| !r.is_empty());

        match (zone, region) {
            (Some(zone), None) => Ok(Location::Zone(zone.to_string())),
            (None, Some(region)) => Ok(Location::Region(region.to_string())),
            _ => Err(LocationError::ZoneOrRegion),
        }
    }

    /// Zone or region name as used in resource paths
    pub fn name(&self) -> &str {
        match self {
            Location::Zone(name) | Location::Region(name) => name,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Zone(name) => write!(f, "zone {}", name),
            Location::Region(name) => write!(f, "region {}", name),
        }
    }
}

/// Invalid project/location input
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("missing project")]
    MissingProject,
    #[error("one of zone or region is required")]
    ZoneOrRegion,
}

/// A project plus location, rendering the `projects/{project}/locations/{location}` parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPath {
    project: String,
    location: Location,
}

impl LocationPath {
    pub fn new(project: &str, location: Location) -> Result<Self, LocationError> {
        if project.is_empty() {
            return Err(LocationError::MissingProject);
        }

        Ok(Self {
            project: project.to_string(),
            location,
        })
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Parent path used to list clusters
    pub fn parent(&self) -> String {
        format!(
            "projects/{}/locations/{}",
            self.project,
            self.location.name()
        )
    }

    /// Full resource name of a cluster in this location
    pub fn cluster(&self, cluster_name: &str) -> String {
        format!("{}/clusters/{}", self.parent(), cluster_name)
    }

    /// Full resource name of an operation in this location
    pub fn operation(&self, operation_name: &str) -> String {
        format!("{}/operations/{}", self.parent(), operation_name)
    }
}
