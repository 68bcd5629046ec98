use super::test_helpers::*;
use super::*;
use crate::types::{DownloadRequest, Priority, Status, Task, TaskFilter, TaskId};
use std::time::Duration;
