use sqlx::PgPool;

use gradebook_config::{CorsConfig, ImportConfig, JwtConfig};

use crate::modules::grades::{GradeService, PgGradeStore};
use crate::modules::spreadsheet::WorkbookReader;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub import_config: ImportConfig,
}

impl AppState {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            jwt_config: JwtConfig::from_env(),
            cors_config: CorsConfig::from_env(),
            import_config: ImportConfig::from_env(),
        }
    }

    /// Grade service backed by the Postgres store and the workbook reader.
    pub fn grade_service(&self) -> GradeService<PgGradeStore, WorkbookReader> {
        GradeService::new(
            PgGradeStore::new(self.db.clone()),
            WorkbookReader::new(self.import_config.max_rows),
            self.import_config.clone(),
        )
    }
}
