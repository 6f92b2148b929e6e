//! Downloading the database file as a backup, and replacing it with an
//! uploaded backup.

use std::{
    fs,
    io::Write,
    mem,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    body::Bytes,
    extract::{FromRef, Multipart, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Redirect, Response},
};
use rusqlite::{Connection, OpenFlags};
use tempfile::NamedTempFile;
use time::{format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error, User, endpoints,
    db::initialize,
    feedback::{Feedback, redirect_with_feedback},
    timezone::local_today,
};

/// The multipart field the backup file is uploaded in.
const BACKUP_FILE_FIELD: &str = "backup_file";

const BACKUP_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year][month][day]");

/// The state needed for backing up and restoring the database.
#[derive(Debug, Clone)]
pub struct BackupState {
    /// The shared database connection. It is swapped out during a restore.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where the database file lives on disk.
    pub db_path: Arc<PathBuf>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Colombo".
    pub local_timezone: String,
}

impl FromRef<AppState> for BackupState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            db_path: state.db_path.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Send the database file as a download named `kasi_backup_YYYYMMDD.db`.
///
/// Responds with `401 Unauthorized` for users that are not admins.
pub async fn backup_endpoint(
    State(state): State<BackupState>,
    Extension(user): Extension<User>,
) -> Response {
    if !user.is_admin {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    let file_name = match local_today(&state.local_timezone)
        .and_then(|today| {
            today
                .format(BACKUP_DATE_FORMAT)
                .map_err(|error| Error::Io(error.to_string()))
        }) {
        Ok(date) => format!("kasi_backup_{date}.db"),
        Err(error) => return error.into_response(),
    };

    // Holding the lock keeps writes from landing halfway through the copy.
    let data = {
        let _connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match fs::read(state.db_path.as_path()) {
            Ok(data) => data,
            Err(error) => {
                tracing::error!(
                    "Could not read database file {}: {error}",
                    state.db_path.display()
                );
                return Error::from(error).into_response();
            }
        }
    };

    tracing::info!("Admin {} downloaded a backup ({} bytes)", user.id, data.len());

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/octet-stream".to_owned()),
            (CONTENT_DISPOSITION, format!("attachment; filename={file_name}")),
        ],
        data,
    )
        .into_response()
}

/// Replace the database with the file uploaded in the `backup_file` field.
///
/// Redirects to the admin page with a success or error message. Users that are
/// not admins are redirected to the home page.
pub async fn restore_endpoint(
    State(state): State<BackupState>,
    Extension(user): Extension<User>,
    mut multipart: Multipart,
) -> Response {
    if !user.is_admin {
        return Redirect::to(endpoints::HOME).into_response();
    }

    let data = match read_backup_file(&mut multipart).await {
        Ok(data) => data,
        Err(error) => {
            tracing::warn!("Could not read uploaded backup: {error}");
            return redirect_with_feedback(endpoints::ADMIN, Feedback::Error("File Error"))
                .into_response();
        }
    };

    match restore_database(&data, &state.db_path, &state.db_connection) {
        Ok(()) => {
            tracing::info!("Admin {} restored the database from a backup", user.id);
            redirect_with_feedback(endpoints::ADMIN, Feedback::Success("Restored!"))
                .into_response()
        }
        Err(Error::InvalidBackup(reason)) => {
            tracing::warn!("Rejected backup upload: {reason}");
            redirect_with_feedback(endpoints::ADMIN, Feedback::Error("Invalid backup file"))
                .into_response()
        }
        Err(Error::Io(reason)) => {
            tracing::error!("Could not write backup to disk: {reason}");
            redirect_with_feedback(endpoints::ADMIN, Feedback::Error("Write Error"))
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not restore database: {error}");
            redirect_with_feedback(endpoints::ADMIN, Feedback::Error("Restore Failed"))
                .into_response()
        }
    }
}

async fn read_backup_file(multipart: &mut Multipart) -> Result<Bytes, Error> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
    {
        if field.name() != Some(BACKUP_FILE_FIELD) {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|error| Error::MultipartError(error.to_string()))?;

        if data.is_empty() {
            return Err(Error::MissingBackupFile);
        }

        return Ok(data);
    }

    Err(Error::MissingBackupFile)
}

/// Replace the database file at `db_path` with `data` and reopen `db_connection`.
///
/// `data` is staged in its own temporary file next to the database file and
/// checked before the live database is touched. The swap happens while holding
/// the connection lock, so other requests wait for the restored database.
///
/// # Errors
///
/// Returns [Error::InvalidBackup] if `data` is not a database with a users table,
/// [Error::Io] if the file could not be written,
/// or another error if the restored database could not be opened and initialized.
pub fn restore_database(
    data: &[u8],
    db_path: &Path,
    db_connection: &Mutex<Connection>,
) -> Result<(), Error> {
    // A rejected upload is deleted when `staged` is dropped.
    let staged = stage_backup(data, db_path)?;
    validate_backup(staged.path())?;

    let mut connection = db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let live_connection = mem::replace(&mut *connection, Connection::open_in_memory()?);
    if let Err((_, error)) = live_connection.close() {
        tracing::warn!("Error closing the database before restoring: {error}");
    }

    let swap_result = staged
        .persist(db_path)
        .map(|_| ())
        .map_err(|error| Error::from(error.error));

    // Reopen even if the swap failed so the server keeps working on the old file.
    *connection = Connection::open(db_path)?;
    initialize(&connection)?;
    swap_result?;

    Ok(())
}

/// Write `data` to a uniquely named file in the same directory as `db_path`,
/// so it can be renamed over the database file.
fn stage_backup(data: &[u8], db_path: &Path) -> Result<NamedTempFile, Error> {
    let directory = db_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut staged = tempfile::Builder::new()
        .prefix(".kasi-restore-")
        .suffix(".db")
        .tempfile_in(directory)?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;

    Ok(staged)
}

fn validate_backup(path: &Path) -> Result<(), Error> {
    let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|error| Error::InvalidBackup(error.to_string()))?;

    let has_users_table: bool = connection
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'users')",
            [],
            |row| row.get(0),
        )
        .map_err(|error| Error::InvalidBackup(error.to_string()))?;

    if has_users_table {
        Ok(())
    } else {
        Err(Error::InvalidBackup("missing users table".to_owned()))
    }
}

#[cfg(test)]
mod backup_tests {
    use std::{
        fs,
        path::Path,
        sync::{Arc, Mutex},
    };

    use axum::{
        Extension,
        body::Body,
        extract::{FromRequest, Multipart, State},
        http::{
            Request, StatusCode,
            header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        },
    };
    use rusqlite::Connection;
    use tempfile::TempDir;
    use time::macros::date;

    use crate::{
        Error, User, db, endpoints,
        expense::{Expense, ExpenseType, create_expense, get_common_expenses},
        test_utils::{assert_redirect, insert_test_user},
        user::{get_all_users, get_user_by_username},
    };

    use super::{BackupState, backup_endpoint, restore_database, restore_endpoint, stage_backup};

    /// Create a database file at `path` with an admin and one common expense named `item`.
    fn create_database(path: &Path, admin_name: &str, item: &str) -> (Connection, User) {
        let connection = Connection::open(path).unwrap();
        db::initialize(&connection).unwrap();
        let admin = insert_test_user(&connection, admin_name, true);
        create_expense(
            Expense::build(item, 1.0, ExpenseType::Common, date!(2024 - 01 - 01), admin.id),
            &connection,
        )
        .unwrap();

        (connection, admin)
    }

    fn get_state(dir: &TempDir) -> (BackupState, User) {
        let db_path = dir.path().join("kasi.db");
        let (connection, admin) = create_database(&db_path, "admin", "live expense");

        let state = BackupState {
            db_connection: Arc::new(Mutex::new(connection)),
            db_path: Arc::new(db_path),
            local_timezone: "Etc/UTC".to_owned(),
        };

        (state, admin)
    }

    /// A database file with different data to restore from.
    fn backup_bytes(dir: &TempDir) -> Vec<u8> {
        let path = dir.path().join("backup.db");
        let (connection, _) = create_database(&path, "restored_admin", "restored expense");
        connection.close().unwrap();

        fs::read(path).unwrap()
    }

    async fn make_multipart(field_name: &str, data: &[u8]) -> Multipart {
        let boundary = "MY_BOUNDARY123456789";
        let mut body = format!(
            "--{boundary}\r\n\
            Content-Disposition: form-data; name=\"{field_name}\"; filename=\"backup.db\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(endpoints::ADMIN_RESTORE)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        Multipart::from_request(request, &()).await.unwrap()
    }

    fn items(state: &BackupState) -> Vec<String> {
        let connection = state.db_connection.lock().unwrap();
        get_common_expenses(None, None, &connection)
            .unwrap()
            .into_iter()
            .map(|expense| expense.item)
            .collect()
    }

    #[tokio::test]
    async fn backup_sends_database_file_to_admins() {
        let dir = tempfile::tempdir().unwrap();
        let (state, admin) = get_state(&dir);
        let want = fs::read(state.db_path.as_path()).unwrap();

        let response = backup_endpoint(State(state), Extension(admin)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/octet-stream"
        );
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();
        assert!(
            disposition.starts_with("attachment; filename=kasi_backup_")
                && disposition.ends_with(".db"),
            "got {disposition}"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.as_ref(), want.as_slice());
    }

    #[tokio::test]
    async fn backup_is_unauthorized_for_regular_users() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = get_state(&dir);
        let alice = {
            let connection = state.db_connection.lock().unwrap();
            insert_test_user(&connection, "alice", false)
        };

        let response = backup_endpoint(State(state), Extension(alice)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn restore_replaces_all_prior_data() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = get_state(&dir);
        let backup = backup_bytes(&dir);

        restore_database(&backup, &state.db_path, &state.db_connection).unwrap();

        assert_eq!(items(&state), ["restored expense"]);
        let connection = state.db_connection.lock().unwrap();
        let usernames: Vec<_> = get_all_users(&connection)
            .unwrap()
            .into_iter()
            .map(|user| user.username)
            .collect();
        assert_eq!(usernames, ["restored_admin"]);
    }

    #[test]
    fn invalid_backup_leaves_live_database_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = get_state(&dir);

        let result = restore_database(
            b"definitely not a database",
            &state.db_path,
            &state.db_connection,
        );

        assert!(matches!(result, Err(Error::InvalidBackup(_))), "got {result:?}");
        assert_eq!(items(&state), ["live expense"]);
        assert_eq!(file_names(&dir), ["kasi.db"], "the rejected upload should be removed");
    }

    fn file_names(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn concurrent_uploads_are_staged_in_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = get_state(&dir);
        let valid = backup_bytes(&dir);

        let first = stage_backup(&valid, &state.db_path).unwrap();
        let second = stage_backup(b"definitely not a database", &state.db_path).unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(first.path().parent(), state.db_path.parent());
        assert_eq!(fs::read(first.path()).unwrap(), valid);
    }

    #[test]
    fn backup_without_users_table_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = get_state(&dir);
        let other_path = dir.path().join("other.db");
        let other = Connection::open(&other_path).unwrap();
        other.execute("CREATE TABLE notes (body TEXT)", ()).unwrap();
        other.close().unwrap();

        let result = restore_database(
            &fs::read(&other_path).unwrap(),
            &state.db_path,
            &state.db_connection,
        );

        assert_eq!(
            result,
            Err(Error::InvalidBackup("missing users table".to_owned()))
        );
        assert_eq!(items(&state), ["live expense"]);
    }

    #[tokio::test]
    async fn restore_endpoint_swaps_in_uploaded_database() {
        let dir = tempfile::tempdir().unwrap();
        let (state, admin) = get_state(&dir);
        let backup = backup_bytes(&dir);

        let response = restore_endpoint(
            State(state.clone()),
            Extension(admin),
            make_multipart("backup_file", &backup).await,
        )
        .await;

        assert_redirect(&response, "/admin?success=Restored%21");
        assert_eq!(items(&state), ["restored expense"]);
        let connection = state.db_connection.lock().unwrap();
        assert!(get_user_by_username("restored_admin", &connection).is_ok());
    }

    #[tokio::test]
    async fn restore_endpoint_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (state, admin) = get_state(&dir);

        let response = restore_endpoint(
            State(state.clone()),
            Extension(admin),
            make_multipart("something_else", b"data").await,
        )
        .await;

        assert_redirect(&response, "/admin?error=File+Error");
        assert_eq!(items(&state), ["live expense"]);
    }

    #[tokio::test]
    async fn restore_endpoint_sends_regular_users_home() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = get_state(&dir);
        let alice = {
            let connection = state.db_connection.lock().unwrap();
            insert_test_user(&connection, "alice", false)
        };
        let backup = backup_bytes(&dir);

        let response = restore_endpoint(
            State(state.clone()),
            Extension(alice),
            make_multipart("backup_file", &backup).await,
        )
        .await;

        assert_redirect(&response, "/");
        assert_eq!(items(&state), ["live expense"]);
    }
}
