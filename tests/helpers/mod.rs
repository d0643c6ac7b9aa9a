pub mod builders;
pub mod fixtures;

pub use builders::{
    hdfs_permission, hdfs_service, hive_service, PolicyBuilder, PrincipalBuilder, TableBuilder,
};
pub use fixtures::Fixture;
