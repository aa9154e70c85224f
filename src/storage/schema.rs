use duckdb::Connection;

/// Name of the raw response table the aggregation runs against.
pub const RESPONSES_TABLE: &str = "survey_responses";

/// SQL statement to create the raw responses table.
///
/// `origin` is the channel a message went out on. It is nullable because
/// upstream loaders do not always fill it in.
pub const CREATE_RESPONSES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS survey_responses (
    id                  BIGINT,
    origin              VARCHAR,
    response_status_id  INTEGER,
    created_at          TIMESTAMP NOT NULL
)
";

/// Index backing the date range predicate.
pub const CREATE_CREATED_AT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_survey_responses_created_at ON survey_responses (created_at)";

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), duckdb::Error> {
    conn.execute_batch(CREATE_RESPONSES_TABLE)?;
    Ok(())
}
