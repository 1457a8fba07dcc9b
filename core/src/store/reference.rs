use super::SimStore;
use crate::{
    error::{SimError, SimResult},
    reference::{EmploymentRecord, IncomeRecord, IncomeRow, PopulationCount, ReferenceTables},
    types::{Age, Gender},
};
use rusqlite::params;

fn parse_age(age: i64) -> SimResult<Age> {
    Age::try_from(age)
        .map_err(|_| SimError::InvalidReference(format!("age {age} out of range")))
}

fn parse_gender(gender: &str) -> SimResult<Gender> {
    Gender::parse(gender)
        .ok_or_else(|| SimError::InvalidReference(format!("unknown gender '{gender}'")))
}

impl SimStore {
    // ── Reference tables ──────────────────────────────────────────

    /// Replace the stored reference tables.
    pub fn save_reference_tables(&self, tables: &ReferenceTables) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM population_distribution;
             DELETE FROM income_by_age_gender;
             DELETE FROM employment_by_age_gender;",
        )?;
        for (age, count) in &tables.population_by_age {
            tx.execute(
                "INSERT INTO population_distribution (age, population) VALUES (?1, ?2)",
                params![*age as i64, *count as i64],
            )?;
        }
        for ((age, gender), row) in &tables.income {
            tx.execute(
                "INSERT INTO income_by_age_gender
                    (age, gender, wages, capital_gains, other_income, total)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    *age as i64,
                    gender.as_str(),
                    row.wages,
                    row.capital_gains,
                    row.other_income,
                    row.total,
                ],
            )?;
        }
        for ((age, gender), rate) in &tables.employment {
            tx.execute(
                "INSERT INTO employment_by_age_gender (age, gender, rate) VALUES (?1, ?2, ?3)",
                params![*age as i64, gender.as_str(), rate],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_reference_tables(&self) -> SimResult<ReferenceTables> {
        let mut stmt = self
            .conn
            .prepare("SELECT age, population FROM population_distribution ORDER BY age")?;
        let population = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(age, count)| {
                let count = u64::try_from(count).map_err(|_| {
                    SimError::InvalidReference(format!("negative population {count} at age {age}"))
                })?;
                Ok(PopulationCount { age: parse_age(age)?, count })
            })
            .collect::<SimResult<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT age, gender, wages, capital_gains, other_income, total
             FROM income_by_age_gender ORDER BY gender, age",
        )?;
        let income = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    IncomeRow {
                        wages:         row.get(2)?,
                        capital_gains: row.get(3)?,
                        other_income:  row.get(4)?,
                        total:         row.get(5)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(age, gender, income)| {
                Ok(IncomeRecord { age: parse_age(age)?, gender: parse_gender(&gender)?, income })
            })
            .collect::<SimResult<Vec<_>>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT age, gender, rate FROM employment_by_age_gender ORDER BY gender, age")?;
        let employment = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, f64>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(age, gender, rate)| {
                Ok(EmploymentRecord { age: parse_age(age)?, gender: parse_gender(&gender)?, rate })
            })
            .collect::<SimResult<Vec<_>>>()?;

        ReferenceTables::from_records(population, income, employment)
    }
}
