//! Start-up reconciliation between what was saved last time and what the
//! folder grant still allows.
//!
//! Steps run strictly in order: load saved state, look for a stored grant,
//! verify read permission, repair missing display metadata, then rebuild the
//! course tree. A lost permission clears the stored course; a failed tree
//! build keeps the grant so the restore can be retried.

use tracing::{info, warn};

use crate::course::builder::build_from_grant;
use crate::error::TreeBuildError;
use crate::session::access::Permission;
use crate::session::context::Session;
use crate::store::schema::CourseInfo;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    NoCourse,
    Restoring,
    /// Transient; always resolves to `NoCourse`.
    Clearing,
    CourseLoaded,
}

impl SessionState {
    pub fn label(self) -> &'static str {
        match self {
            SessionState::NoCourse => "no course",
            SessionState::Restoring => "restoring",
            SessionState::Clearing => "clearing",
            SessionState::CourseLoaded => "course loaded",
        }
    }
}

#[derive(Debug, Default)]
pub struct BootstrapReport {
    pub state: SessionState,
    /// A stored grant was found.
    pub had_grant: bool,
    /// The stored grant was rejected and the course was cleared.
    pub permission_lost: bool,
    /// Display metadata was missing and has been derived from the grant.
    pub metadata_repaired: bool,
    pub tree_error: Option<TreeBuildError>,
}

impl Session {
    /// Run the start-up sequence once. Never fails: every problem ends in
    /// either `CourseLoaded` or `NoCourse` with the reason in the report.
    pub fn bootstrap(&mut self) -> BootstrapReport {
        let mut report = BootstrapReport::default();

        self.load();

        let Some(grant) = self.gateway.load_grant() else {
            info!("no stored course folder");
            self.state = SessionState::NoCourse;
            report.state = self.state;
            return report;
        };
        report.had_grant = true;

        match self.access.request_permission(&grant) {
            Ok(Permission::Granted) => {
                self.state = SessionState::Restoring;
                info!(folder = %grant.name, "restoring course folder");
            }
            Ok(Permission::Denied) => {
                warn!(folder = %grant.name, "read permission denied; clearing stored course");
                self.clear_course();
                report.permission_lost = true;
                report.state = self.state;
                return report;
            }
            Err(e) => {
                warn!(folder = %grant.name, error = %e, "stored folder grant unusable; clearing stored course");
                self.clear_course();
                report.permission_lost = true;
                report.state = self.state;
                return report;
            }
        }

        if self.course_info.is_none() {
            let info = CourseInfo::now(&grant.name, &grant.name);
            self.gateway.store_course_info(&info);
            self.course_info = Some(info);
            report.metadata_repaired = true;
        }
        self.grant = Some(grant);

        report.tree_error = self.rebuild_from_grant().err();
        report.state = self.state;
        report
    }

    /// Try the tree build again after a failed restore. Only meaningful when
    /// a grant is held but no course is loaded.
    pub fn retry_restore(&mut self) -> Result<(), TreeBuildError> {
        if self.course.is_some() {
            return Ok(());
        }
        self.rebuild_from_grant()
    }

    fn rebuild_from_grant(&mut self) -> Result<(), TreeBuildError> {
        let Some(grant) = self.grant.clone() else {
            return Err(TreeBuildError::NoGrant);
        };
        self.state = SessionState::Restoring;
        match build_from_grant(self.access.as_ref(), &grant) {
            Ok(course) => {
                info!(course = %course.name, lessons = course.lesson_count(), "course restored");
                let info = self
                    .course_info
                    .clone()
                    .unwrap_or_else(|| CourseInfo::now(&grant.name, &grant.name));
                self.install_course(course, Some(grant), info);
                Ok(())
            }
            Err(e) => {
                warn!(folder = %grant.name, error = %e, "course folder could not be read; keeping access for retry");
                self.state = SessionState::NoCourse;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::course::listing::FolderListing;
    use crate::error::{AccessError, UnsupportedEnvironmentError};
    use crate::session::access::{FolderAccess, LocalFolderAccess};
    use crate::session::playback::FileMediaOpener;
    use crate::store::gateway::DurableStateGateway;
    use crate::store::kv::MemoryKvStore;
    use crate::store::schema::FolderGrant;
    use crate::store::structured::MemoryStructuredStore;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct DenyingAccess;

    impl FolderAccess for DenyingAccess {
        fn check_environment(&self) -> Result<(), UnsupportedEnvironmentError> {
            Ok(())
        }
        fn grant(&self, root: &Path) -> Result<FolderGrant, AccessError> {
            LocalFolderAccess.grant(root)
        }
        fn request_permission(&self, _grant: &FolderGrant) -> Result<Permission, AccessError> {
            Ok(Permission::Denied)
        }
        fn list(&self, grant: &FolderGrant) -> Result<FolderListing, TreeBuildError> {
            LocalFolderAccess.list(grant)
        }
    }

    fn session_with(access: Box<dyn FolderAccess>) -> Session {
        let gateway = DurableStateGateway::new(
            Box::new(MemoryKvStore::new()),
            Box::new(MemoryStructuredStore::default()),
        );
        Session::new(Config::default(), gateway, access, Box::new(FileMediaOpener)).unwrap()
    }

    fn store_grant(session: &mut Session, root: &Path) -> FolderGrant {
        let grant = FolderGrant {
            name: root.file_name().unwrap().to_string_lossy().into_owned(),
            root: root.to_path_buf(),
        };
        session.gateway.store_grant(&grant);
        grant
    }

    #[test]
    fn nothing_stored_means_no_course() {
        let mut session = session_with(Box::new(LocalFolderAccess));
        let report = session.bootstrap();
        assert_eq!(report.state, SessionState::NoCourse);
        assert!(!report.had_grant);
    }

    #[test]
    fn granted_folder_is_restored_and_metadata_repaired() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Basics")).unwrap();
        fs::write(dir.path().join("Basics/1 Intro.mp4"), b"").unwrap();

        let mut session = session_with(Box::new(LocalFolderAccess));
        let grant = store_grant(&mut session, dir.path());
        let report = session.bootstrap();

        assert_eq!(report.state, SessionState::CourseLoaded);
        assert!(report.metadata_repaired);
        assert_eq!(session.course().unwrap().lesson_count(), 1);
        let info = session.gateway.load_course_info().unwrap();
        assert_eq!(info.name, grant.name);
        assert_eq!(info.path, grant.name);
    }

    #[test]
    fn denied_permission_clears_stored_course() {
        let dir = TempDir::new().unwrap();
        let mut session = session_with(Box::new(DenyingAccess));
        let grant = store_grant(&mut session, dir.path());
        session
            .gateway
            .store_course_info(&CourseInfo::now(&grant.name, &grant.name));

        let report = session.bootstrap();
        assert_eq!(report.state, SessionState::NoCourse);
        assert!(report.permission_lost);
        assert!(session.gateway.load_grant().is_none());
        assert!(session.gateway.load_course_info().is_none());
        assert!(session.course_info().is_none());
    }

    #[test]
    fn vanished_folder_keeps_grant_until_it_returns() {
        let dir = TempDir::new().unwrap();
        let course = dir.path().join("MyCourse");
        fs::create_dir_all(course.join("Basics")).unwrap();
        fs::write(course.join("Basics/1 Intro.mp4"), b"").unwrap();

        let mut session = session_with(Box::new(LocalFolderAccess));
        let grant = store_grant(&mut session, &course);
        let unplugged = dir.path().join("unplugged");
        fs::rename(&course, &unplugged).unwrap();

        let report = session.bootstrap();
        assert_eq!(report.state, SessionState::NoCourse);
        assert!(!report.permission_lost);
        assert!(matches!(report.tree_error, Some(TreeBuildError::Enumerate { .. })));
        assert_eq!(session.gateway.load_grant(), Some(grant.clone()));
        assert_eq!(session.grant(), Some(&grant));

        fs::rename(&unplugged, &course).unwrap();
        session.retry_restore().unwrap();
        assert_eq!(session.state(), SessionState::CourseLoaded);
        assert_eq!(session.course().unwrap().lesson_count(), 1);
    }

    #[test]
    fn retry_without_grant_reports_no_grant() {
        let mut session = session_with(Box::new(LocalFolderAccess));
        session.bootstrap();
        assert!(matches!(
            session.retry_restore(),
            Err(TreeBuildError::NoGrant)
        ));
    }
}
