//! Statement Executor for flatdb
//!
//! This module classifies a token stream and runs the matching handler
//! against the catalog and the table files.

use std::fs::OpenOptions;
use std::io::Write;
use tracing::{debug, info, warn};

use super::condition::{evaluate_chain, parse_where};
use super::result::QueryResult;
use super::row::RowSchema;
use super::select::{execute_select, SelectQuery};
use crate::catalog::types::MAX_STRING_LEN;
use crate::catalog::{Catalog, ColumnDescriptor, ColumnType, TableDescriptor, MAX_NUM_COL};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::sql::{tokenize, Keyword, StatementKind, Symbol, TokenClass, TokenStream, TokenValue};
use crate::storage::{TableFile, Value, MAX_ROWS};

/// Execution Engine
pub struct ExecutionEngine {
    config: Config,
    /// System catalog
    catalog: Catalog,
}

impl ExecutionEngine {
    /// Open the engine: create the data directory if needed and load the
    /// catalog.
    pub fn open(config: Config) -> Result<Self> {
        config.ensure_data_dir()?;
        let catalog = Catalog::load(config.catalog_path())?;
        Ok(Self { config, catalog })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Tokenize and execute one command
    pub fn execute_sql(&mut self, sql: &str) -> Result<QueryResult> {
        let mut stream = TokenStream::new(tokenize(sql)?);
        self.execute(&mut stream)
    }

    /// Execute one statement. On failure the offending token, if known, is
    /// marked in `stream`.
    pub fn execute(&mut self, stream: &mut TokenStream) -> Result<QueryResult> {
        for token in stream.tokens() {
            debug!(text = %token.text, class = ?token.class, value = ?token.value, "token");
        }

        let kind = StatementKind::classify(stream)?;
        debug!(statement = %kind, "dispatching");

        match kind {
            StatementKind::CreateTable => self.execute_create_table(stream),
            StatementKind::DropTable => self.execute_drop_table(stream),
            StatementKind::ListTable => self.execute_list_tables(stream),
            StatementKind::ListSchema => self.execute_list_schema(stream),
            StatementKind::Insert => self.execute_insert(stream),
            StatementKind::Delete => self.execute_delete(stream),
            StatementKind::Update => self.execute_update(stream),
            StatementKind::Select => {
                let query = SelectQuery::parse(stream)?;
                execute_select(&self.catalog, &self.config, stream, query)
            }
        }
    }

    /// Read a table name and look it up
    fn existing_table(&self, stream: &mut TokenStream) -> Result<TableDescriptor> {
        if !stream.current().is_name() {
            return Err(stream.reject(Error::InvalidTableName));
        }
        match self.catalog.find(&stream.current().text) {
            Some(table) => {
                let table = table.clone();
                stream.advance();
                Ok(table)
            }
            None => {
                let name = stream.current().text.clone();
                Err(stream.reject(Error::TableNotExist(name)))
            }
        }
    }

    fn expect_end(stream: &mut TokenStream, err: Error) -> Result<()> {
        if stream.at_end() {
            Ok(())
        } else {
            Err(stream.reject(err))
        }
    }

    fn execute_create_table(&mut self, stream: &mut TokenStream) -> Result<QueryResult> {
        if !stream.current().is_name() {
            return Err(stream.reject(Error::InvalidTableName));
        }
        let name = stream.current().text.clone();
        if self.catalog.find(&name).is_some() {
            return Err(stream.reject(Error::DuplicateTableName(name)));
        }
        stream.advance();

        if !stream.eat_symbol(Symbol::LParen) {
            return Err(stream.reject(Error::InvalidTableDefinition));
        }

        let mut table = TableDescriptor::new(name);
        loop {
            let column = Self::parse_column_definition(stream, &table)?;
            table.add_column(column)?;

            if stream.eat_symbol(Symbol::Comma) {
                continue;
            }
            if stream.eat_symbol(Symbol::RParen) {
                break;
            }
            return Err(stream.reject(Error::InvalidColumnDefinition));
        }

        Self::expect_end(stream, Error::InvalidTableDefinition)?;

        self.catalog.add(table.clone())?;
        TableFile::create(self.config.table_path(&table.name), &table)?;

        info!(table = %table.name, columns = table.columns.len(), "table created");
        Ok(QueryResult::with_message(format!(
            "Table '{}' created.",
            table.name
        )))
    }

    /// `name type [(len)] [NOT NULL]`
    fn parse_column_definition(
        stream: &mut TokenStream,
        table: &TableDescriptor,
    ) -> Result<ColumnDescriptor> {
        if !stream.current().is_name() {
            return Err(stream.reject(Error::InvalidColumnName));
        }
        let name = stream.current().text.clone();
        if table.find_column(&name).is_some() {
            return Err(stream.reject(Error::DuplicateColumnName(name)));
        }
        if table.columns.len() >= MAX_NUM_COL {
            return Err(stream.reject(Error::MaxColumnExceeded(MAX_NUM_COL)));
        }
        stream.advance();

        if stream.current().class != TokenClass::TypeName {
            return Err(stream.reject(Error::InvalidTypeName));
        }
        let column_type = match stream.current().as_keyword() {
            Some(Keyword::Char) => ColumnType::Char,
            Some(Keyword::Varchar) => ColumnType::Varchar,
            _ => ColumnType::Int,
        };
        stream.advance();

        let mut length = 0;
        if column_type.is_string() {
            if !stream.eat_symbol(Symbol::LParen) {
                return Err(stream.reject(Error::InvalidColumnDefinition));
            }
            if stream.current().value != TokenValue::IntLiteral {
                return Err(stream.reject(Error::InvalidColumnLength));
            }
            length = match stream.current().text.parse::<u32>() {
                Ok(n) if (1..=MAX_STRING_LEN).contains(&n) => n,
                _ => return Err(stream.reject(Error::InvalidColumnLength)),
            };
            stream.advance();
            if !stream.eat_symbol(Symbol::RParen) {
                return Err(stream.reject(Error::InvalidColumnDefinition));
            }
        }

        let mut not_null = false;
        if stream.eat_keyword(Keyword::Not) {
            if !stream.eat_keyword(Keyword::Null) {
                return Err(stream.reject(Error::InvalidColumnDefinition));
            }
            not_null = true;
        }

        Ok(ColumnDescriptor::new(name, column_type, length).not_null(not_null))
    }

    fn execute_drop_table(&mut self, stream: &mut TokenStream) -> Result<QueryResult> {
        if !stream.current().is_name() {
            return Err(stream.reject(Error::InvalidTableName));
        }
        let name = stream.next_token().text;
        Self::expect_end(stream, Error::InvalidStatement)?;

        let removed = self.catalog.remove(&name).map_err(|e| {
            let index = stream.position().saturating_sub(1);
            stream.reject_at(index, e)
        })?;
        TableFile::remove(self.config.table_path(&removed.name))?;

        Ok(QueryResult::with_message(format!(
            "Table '{}' dropped.",
            removed.name
        )))
    }

    fn execute_list_tables(&mut self, stream: &mut TokenStream) -> Result<QueryResult> {
        Self::expect_end(stream, Error::InvalidStatement)?;

        if self.catalog.is_empty() {
            return Ok(QueryResult::with_message(
                "There are currently no tables defined",
            ));
        }

        let mut lines = vec!["Table List".to_string(), "*****************".to_string()];
        lines.extend(self.catalog.tables().iter().map(|t| t.name.clone()));
        lines.push("****** End ******".to_string());
        Ok(QueryResult::with_message(lines.join("\n")))
    }

    fn execute_list_schema(&mut self, stream: &mut TokenStream) -> Result<QueryResult> {
        if !stream.eat_keyword(Keyword::For) {
            return Err(stream.reject(Error::InvalidStatement));
        }
        let table = self.existing_table(stream)?;

        let report_file = if stream.eat_keyword(Keyword::To) {
            if !stream.current().is_name() {
                return Err(stream.reject(Error::InvalidReportFileName));
            }
            Some(stream.next_token().text)
        } else {
            None
        };
        Self::expect_end(stream, Error::InvalidStatement)?;

        let info = self.catalog.get_table_info(&table.name)?;

        if let Some(file) = report_file {
            let path = self.config.report_path(&file);
            let mut report = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| Error::open(&path, e))?;
            report
                .write_all(info.as_bytes())
                .map_err(|e| Error::write(&path, e))?;
            info!(path = %path.display(), table = %table.name, "schema report written");
        }

        Ok(QueryResult::with_message(info.trim_end()))
    }

    /// Parse a literal for `column`. A token that is not a literal or NULL
    /// fails with `bad_token`.
    fn parse_value(
        stream: &mut TokenStream,
        column: &ColumnDescriptor,
        bad_token: Error,
    ) -> Result<Value> {
        let token = stream.current().clone();

        let value = match token.value {
            TokenValue::Keyword(Keyword::Null) => {
                if column.not_null {
                    return Err(stream.reject(Error::NotNullViolation(column.name.clone())));
                }
                Value::Null
            }
            TokenValue::IntLiteral => {
                if column.column_type != ColumnType::Int {
                    return Err(stream.reject(Error::TypeMismatch(column.name.clone())));
                }
                match token.text.parse::<i32>() {
                    Ok(v) => Value::Int(v),
                    Err(_) => return Err(stream.reject(Error::TypeMismatch(column.name.clone()))),
                }
            }
            TokenValue::StringLiteral => {
                if !column.column_type.is_string() {
                    return Err(stream.reject(Error::TypeMismatch(column.name.clone())));
                }
                if token.text.is_empty() || token.text.len() > column.length as usize {
                    return Err(stream.reject(Error::InvalidColumnLength));
                }
                Value::Str(token.text)
            }
            _ => return Err(stream.reject(bad_token)),
        };

        stream.advance();
        Ok(value)
    }

    fn execute_insert(&mut self, stream: &mut TokenStream) -> Result<QueryResult> {
        let table = self.existing_table(stream)?;

        if !stream.eat_keyword(Keyword::Values) {
            return Err(stream.reject(Error::InvalidStatement));
        }
        if !stream.eat_symbol(Symbol::LParen) {
            return Err(stream.reject(Error::InvalidStatement));
        }

        let mut values = Vec::with_capacity(table.columns.len());
        for (i, column) in table.columns.iter().enumerate() {
            values.push(Self::parse_value(
                stream,
                column,
                Error::InvalidInsertDefinition,
            )?);

            let separator = if i + 1 < table.columns.len() {
                Symbol::Comma
            } else {
                Symbol::RParen
            };
            if !stream.eat_symbol(separator) {
                return Err(stream.reject(Error::InvalidInsertDefinition));
            }
        }
        Self::expect_end(stream, Error::InvalidStatement)?;

        let mut file = TableFile::open(self.config.table_path(&table.name), &table)?;
        if file.num_records() >= MAX_ROWS {
            return Err(Error::TableFull(table.name, file.num_records()));
        }

        let record = file.layout().encode(&values);
        file.append(&record)?;

        debug!(table = %table.name, num_records = file.num_records(), "row inserted");
        Ok(QueryResult::with_affected_rows(1, "1 row(s) inserted."))
    }

    fn execute_delete(&mut self, stream: &mut TokenStream) -> Result<QueryResult> {
        let table = self.existing_table(stream)?;
        let schema = RowSchema::single(&table);
        let conditions = parse_where(stream, &schema)?;
        Self::expect_end(stream, Error::InvalidStatement)?;

        let mut file = TableFile::open(self.config.table_path(&table.name), &table)?;
        let records = file.scan()?;
        let total = records.len();

        let kept: Vec<Vec<u8>> = records
            .into_iter()
            .filter(|record| !evaluate_chain(&conditions, &schema, record))
            .collect();
        let deleted = total - kept.len();

        if deleted == 0 {
            warn!(table = %table.name, "DELETE matched no rows");
            return Ok(QueryResult::with_affected_rows(0, "Warning: No rows deleted."));
        }

        for (i, record) in kept.iter().enumerate() {
            file.write_record(i as u32, record)?;
        }
        file.set_num_records(kept.len() as u32);
        file.persist_header()?;

        info!(table = %table.name, deleted, remaining = kept.len(), "rows deleted");
        Ok(QueryResult::with_affected_rows(
            deleted,
            format!("{} row(s) deleted.", deleted),
        ))
    }

    fn execute_update(&mut self, stream: &mut TokenStream) -> Result<QueryResult> {
        let table = self.existing_table(stream)?;

        if !stream.eat_keyword(Keyword::Set) {
            return Err(stream.reject(Error::InvalidStatement));
        }
        if !stream.current().is_name() {
            return Err(stream.reject(Error::InvalidColumnName));
        }
        let column_index = match table.column_index(&stream.current().text) {
            Some(idx) => idx,
            None => {
                let name = stream.current().text.clone();
                return Err(stream.reject(Error::ColumnNotExist(name)));
            }
        };
        stream.advance();

        if !stream.eat_symbol(Symbol::Eq) {
            return Err(stream.reject(Error::InvalidStatement));
        }
        let value = Self::parse_value(
            stream,
            &table.columns[column_index],
            Error::InvalidUpdateDefinition,
        )?;

        let schema = RowSchema::single(&table);
        let conditions = parse_where(stream, &schema)?;
        Self::expect_end(stream, Error::InvalidStatement)?;

        let mut file = TableFile::open(self.config.table_path(&table.name), &table)?;
        let records = file.scan()?;
        let layout = file.layout().clone();

        let mut updated = 0;
        for (i, mut record) in records.into_iter().enumerate() {
            if !evaluate_chain(&conditions, &schema, &record) {
                continue;
            }
            layout.write_field(&mut record, column_index, &value);
            file.write_record(i as u32, &record)?;
            updated += 1;
        }

        if updated == 0 {
            warn!(table = %table.name, "UPDATE matched no rows");
            return Ok(QueryResult::with_affected_rows(0, "Warning: No rows updated."));
        }

        info!(table = %table.name, updated, "rows updated");
        Ok(QueryResult::with_affected_rows(
            updated,
            format!("{} row(s) updated.", updated),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_engine() -> (TempDir, ExecutionEngine) {
        let dir = TempDir::new().unwrap();
        let engine = ExecutionEngine::open(Config::new().data_dir(dir.path())).unwrap();
        (dir, engine)
    }

    fn run(engine: &mut ExecutionEngine, sql: &str) -> (Result<QueryResult>, Option<String>) {
        let mut stream = TokenStream::new(tokenize(sql).unwrap());
        let result = engine.execute(&mut stream);
        (result, stream.offending().map(|t| t.text.clone()))
    }

    #[test]
    fn test_create_table() {
        let (dir, mut engine) = create_test_engine();

        let result = engine
            .execute_sql("CREATE TABLE users (id int NOT NULL, name varchar(10), tag char(2))")
            .unwrap();
        assert_eq!(result.to_string(), "Table 'users' created.");
        assert!(dir.path().join("users.tab").exists());

        let table = engine.catalog().get_table("users").unwrap();
        assert!(table.columns[0].not_null);
        assert_eq!(table.columns[1].column_type, ColumnType::Varchar);
        assert_eq!(table.columns[2].length, 2);
    }

    #[test]
    fn test_create_table_errors() {
        let (_dir, mut engine) = create_test_engine();

        let cases = [
            ("CREATE TABLE t a int)", "a", -396),
            ("CREATE TABLE t (a blob)", "blob", -391),
            ("CREATE TABLE t (a char)", ")", -390),
            ("CREATE TABLE t (a char(0))", "0", -389),
            ("CREATE TABLE t (a char(256))", "256", -389),
            ("CREATE TABLE t (a int, A int)", "A", -394),
            ("CREATE TABLE t (a int NOT 5)", "5", -390),
            ("CREATE TABLE t (a int b)", "b", -390),
            ("CREATE TABLE t (a int) x", "x", -396),
            ("CREATE TABLE t (, int)", ",", -395),
        ];

        for (sql, token, code) in cases {
            let (result, offending) = run(&mut engine, sql);
            let err = result.unwrap_err();
            assert_eq!(err.code(), code, "{}", sql);
            assert_eq!(offending.as_deref(), Some(token), "{}", sql);
        }
        assert!(engine.catalog().is_empty());
    }

    #[test]
    fn test_too_many_columns() {
        let (_dir, mut engine) = create_test_engine();
        let columns: Vec<String> = (0..17).map(|i| format!("c{} int", i)).collect();
        let sql = format!("CREATE TABLE wide ({})", columns.join(", "));

        let (result, offending) = run(&mut engine, &sql);
        assert!(matches!(result, Err(Error::MaxColumnExceeded(16))));
        assert_eq!(offending.as_deref(), Some("c16"));
    }

    #[test]
    fn test_insert_validation() {
        let (_dir, mut engine) = create_test_engine();
        engine
            .execute_sql("CREATE TABLE t (id int NOT NULL, name char(3))")
            .unwrap();

        let cases = [
            ("INSERT INTO t VALUES (NULL, 'a')", -386),
            ("INSERT INTO t VALUES ('1', 'a')", -387),
            ("INSERT INTO t VALUES (1, 2)", -387),
            ("INSERT INTO t VALUES (1, 'abcd')", -389),
            ("INSERT INTO t VALUES (1, '')", -389),
            ("INSERT INTO t VALUES (1)", -385),
            ("INSERT INTO t VALUES (1, 'a', 2)", -385),
            ("INSERT INTO t VALUES (1, int)", -385),
            ("INSERT INTO t VALUES (99999999999, 'a')", -387),
            ("INSERT INTO t (1, 'a')", -199),
            ("INSERT INTO nope VALUES (1, 'a')", -397),
        ];
        for (sql, code) in cases {
            let (result, _) = run(&mut engine, sql);
            assert_eq!(result.unwrap_err().code(), code, "{}", sql);
        }

        let result = engine.execute_sql("INSERT INTO t VALUES (1, NULL)").unwrap();
        assert_eq!(result.to_string(), "1 row(s) inserted.");
    }

    #[test]
    fn test_update_rows() {
        let (_dir, mut engine) = create_test_engine();
        engine.execute_sql("CREATE TABLE t (a int, b int)").unwrap();
        for i in 1..=4 {
            engine
                .execute_sql(&format!("INSERT INTO t VALUES ({}, 0)", i))
                .unwrap();
        }

        let result = engine.execute_sql("UPDATE t SET b = 7 WHERE a > 2").unwrap();
        assert_eq!(result.to_string(), "2 row(s) updated.");

        let result = engine.execute_sql("UPDATE t SET b = NULL WHERE a = 9").unwrap();
        assert_eq!(result.to_string(), "Warning: No rows updated.");

        let result = engine.execute_sql("SELECT SUM(b), COUNT(b) FROM t").unwrap();
        assert!(result.to_string().ends_with("        14          4"));

        let (result, _) = run(&mut engine, "UPDATE t SET b = 'x'");
        assert_eq!(result.unwrap_err().code(), -387);
        let (result, _) = run(&mut engine, "UPDATE t SET b = ,");
        assert_eq!(result.unwrap_err().code(), -384);
        let (result, _) = run(&mut engine, "UPDATE t SET zz = 1");
        assert_eq!(result.unwrap_err().code(), -393);
        let (result, _) = run(&mut engine, "UPDATE t b = 1");
        assert_eq!(result.unwrap_err().code(), -199);
    }

    #[test]
    fn test_list_tables() {
        let (_dir, mut engine) = create_test_engine();
        assert_eq!(
            engine.execute_sql("LIST TABLE").unwrap().to_string(),
            "There are currently no tables defined"
        );

        engine.execute_sql("CREATE TABLE a (x int)").unwrap();
        engine.execute_sql("CREATE TABLE b (x int)").unwrap();
        assert_eq!(
            engine.execute_sql("LIST TABLE").unwrap().to_string(),
            "Table List\n*****************\na\nb\n****** End ******"
        );
    }
}
