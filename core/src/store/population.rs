use super::SimStore;
use crate::{
    diagnostics::FitReport,
    error::{SimError, SimResult},
    synthesizer::Individual,
    tax_engine::{TaxTotals, TaxedIndividual},
    types::{Gender, Status},
};
use rusqlite::params;

impl SimStore {
    // ── Population ────────────────────────────────────────────────

    /// Bulk insert in a single transaction.
    pub fn insert_population(&self, run_id: &str, population: &[Individual]) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO population (
                    run_id, person_id, age, gender, status, occupation,
                    wages, capital_gains, other_income, total_income
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for p in population {
                stmt.execute(params![
                    run_id,
                    p.person_id as i64,
                    p.age as i64,
                    p.gender.as_str(),
                    p.status.as_str(),
                    &p.occupation,
                    p.wages,
                    p.capital_gains,
                    p.other_income,
                    p.total_income,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn population_count(&self, run_id: &str) -> SimResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM population WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn load_population(&self, run_id: &str) -> SimResult<Vec<Individual>> {
        let mut stmt = self.conn.prepare(
            "SELECT person_id, age, gender, status, occupation,
                    wages, capital_gains, other_income, total_income
             FROM population WHERE run_id = ?1 ORDER BY person_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, f64>(7)?,
                    row.get::<_, f64>(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, age, gender, status, occupation, wages, cg, other, total)| {
                let gender = Gender::parse(&gender).ok_or_else(|| {
                    SimError::InvalidReference(format!("unknown gender '{gender}'"))
                })?;
                let status = Status::parse(&status).ok_or_else(|| {
                    SimError::InvalidReference(format!("unknown status '{status}'"))
                })?;
                let age = u8::try_from(age).map_err(|_| {
                    SimError::InvalidReference(format!("age {age} out of range"))
                })?;
                Ok(Individual {
                    person_id: id as u64,
                    age,
                    gender,
                    status,
                    occupation,
                    wages,
                    capital_gains: cg,
                    other_income: other,
                    total_income: total,
                })
            })
            .collect()
    }

    // ── Taxes ─────────────────────────────────────────────────────

    pub fn insert_taxes(&self, run_id: &str, taxed: &[TaxedIndividual]) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO population_tax (
                    run_id, person_id, state_tax, income_tax, municipal_tax,
                    capital_gains_tax, broadcasting_fee, elderly_fund_fee,
                    fixed_fees, total_tax
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for t in taxed {
                stmt.execute(params![
                    run_id,
                    t.individual.person_id as i64,
                    t.tax.state_tax,
                    t.tax.income_tax,
                    t.tax.municipal_tax,
                    t.tax.capital_gains_tax,
                    t.tax.broadcasting_fee,
                    t.tax.elderly_fund_fee,
                    t.tax.fixed_fees,
                    t.tax.total_tax,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Totals recomputed in SQL from the persisted rows.
    pub fn tax_totals(&self, run_id: &str) -> SimResult<TaxTotals> {
        let totals = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(state_tax), 0), COALESCE(SUM(income_tax), 0),
                    COALESCE(SUM(municipal_tax), 0), COALESCE(SUM(capital_gains_tax), 0),
                    COALESCE(SUM(broadcasting_fee), 0), COALESCE(SUM(elderly_fund_fee), 0),
                    COALESCE(SUM(fixed_fees), 0), COALESCE(SUM(total_tax), 0)
             FROM population_tax WHERE run_id = ?1",
            params![run_id],
            |row| {
                Ok(TaxTotals {
                    individuals:       row.get::<_, i64>(0)? as usize,
                    state_tax:         row.get(1)?,
                    income_tax:        row.get(2)?,
                    municipal_tax:     row.get(3)?,
                    capital_gains_tax: row.get(4)?,
                    broadcasting_fee:  row.get(5)?,
                    elderly_fund_fee:  row.get(6)?,
                    fixed_fees:        row.get(7)?,
                    total_tax:         row.get(8)?,
                })
            },
        )?;
        Ok(totals)
    }

    // ── Diagnostics ───────────────────────────────────────────────

    pub fn insert_fit_groups(&self, run_id: &str, report: &FitReport) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO fit_group (
                    run_id, age, gender, individuals, ref_total, gen_total,
                    err_total, err_wages, err_cg, err_other
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for g in &report.groups {
                stmt.execute(params![
                    run_id,
                    g.age as i64,
                    g.gender.as_str(),
                    g.individuals as i64,
                    g.reference.total,
                    g.synthesized.total,
                    g.error.total,
                    g.error.wages,
                    g.error.capital_gains,
                    g.error.other_income,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn fit_group_count(&self, run_id: &str) -> SimResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM fit_group WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
