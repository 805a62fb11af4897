//! Dashboard aggregates derived from the payment history.
//!
//! Pure functions over an already-fetched payment list; nothing here
//! touches storage. Every call recomputes from scratch, which is fine
//! for a single device's bounded history. Callers pass "today" in, so a
//! dashboard refresh and a test exercise the same code.

use chrono::{Datelike, Duration, Local, NaiveDate};
use shared::{
    Cobro, CobroDetalle, ResumenCobros, TotalDiario, TotalPorComerciante, TotalPorPuesto,
};
use std::collections::BTreeSet;

fn fecha_str(dia: NaiveDate) -> String {
    dia.format("%Y-%m-%d").to_string()
}

fn mes_str(dia: NaiveDate) -> String {
    dia.format("%Y-%m").to_string()
}

fn suma<F>(cobros: &[Cobro], pred: F) -> f64
where
    F: Fn(&Cobro) -> bool,
{
    cobros.iter().filter(|c| pred(c)).map(|c| c.monto_cobrado).sum()
}

/// Sum of amounts charged today
pub fn total_hoy(cobros: &[Cobro], hoy: NaiveDate) -> f64 {
    let hoy = fecha_str(hoy);
    suma(cobros, |c| c.fecha_cobro == hoy)
}

/// Sum of amounts charged in the current week, Monday through Sunday
pub fn total_semana(cobros: &[Cobro], hoy: NaiveDate) -> f64 {
    // number_from_monday counts Sunday as day 7, so the offset back to
    // Monday is 0..=6
    let desde_lunes = hoy.weekday().number_from_monday() as i64 - 1;
    let lunes = fecha_str(hoy - Duration::days(desde_lunes));
    let domingo = fecha_str(hoy - Duration::days(desde_lunes) + Duration::days(6));
    suma(cobros, |c| c.fecha_cobro >= lunes && c.fecha_cobro <= domingo)
}

/// Sum of amounts charged in the current calendar month
pub fn total_mes(cobros: &[Cobro], hoy: NaiveDate) -> f64 {
    let mes = mes_str(hoy);
    suma(cobros, |c| c.fecha_cobro.starts_with(&mes))
}

/// Grand total over the full history
pub fn total_general(cobros: &[Cobro]) -> f64 {
    suma(cobros, |_| true)
}

/// Grand total divided by the count of distinct dates with at least one
/// payment; 0 when the history is empty
pub fn promedio_diario(cobros: &[Cobro]) -> f64 {
    let dias: BTreeSet<&str> = cobros.iter().map(|c| c.fecha_cobro.as_str()).collect();
    if dias.is_empty() {
        return 0.0;
    }
    total_general(cobros) / dias.len() as f64
}

/// Year-over-year delta for the current month as a percentage rounded to
/// the nearest integer. A prior-year total of 0 yields 0 by policy, not
/// a division-by-zero failure.
pub fn variacion_anual(cobros: &[Cobro], hoy: NaiveDate) -> i64 {
    let mes_actual = mes_str(hoy);
    let mes_anterior = format!("{:04}-{:02}", hoy.year() - 1, hoy.month());

    let actual = suma(cobros, |c| c.fecha_cobro.starts_with(&mes_actual));
    let anterior = suma(cobros, |c| c.fecha_cobro.starts_with(&mes_anterior));

    if anterior == 0.0 {
        return 0;
    }
    (((actual - anterior) / anterior) * 100.0).round() as i64
}

/// Per-day totals for the last 7 calendar days, today included, oldest
/// first, with explicit zeros for empty days
pub fn serie_ultimos_7_dias(cobros: &[Cobro], hoy: NaiveDate) -> Vec<TotalDiario> {
    (0..7)
        .rev()
        .map(|atras| {
            let etiqueta = fecha_str(hoy - Duration::days(atras));
            let total = suma(cobros, |c| c.fecha_cobro == etiqueta);
            TotalDiario { etiqueta, total }
        })
        .collect()
}

/// Monthly totals for the trailing 6 months that actually had payments,
/// chronological. Meaningful for trend charting from 2 months on.
pub fn serie_meses(cobros: &[Cobro]) -> Vec<TotalDiario> {
    let mut meses: Vec<TotalDiario> = Vec::new();
    // Month labels sort chronologically as strings
    let etiquetas: BTreeSet<&str> = cobros
        .iter()
        .filter(|c| c.fecha_cobro.len() >= 7)
        .map(|c| &c.fecha_cobro[..7])
        .collect();

    for etiqueta in etiquetas {
        let total = suma(cobros, |c| c.fecha_cobro.starts_with(etiqueta));
        meses.push(TotalDiario {
            etiqueta: etiqueta.to_string(),
            total,
        });
    }

    if meses.len() > 6 {
        meses.drain(..meses.len() - 6);
    }
    meses
}

/// Top 5 stalls by summed amount, descending; ties keep the order the
/// stalls were first encountered in. Payments without a stall are
/// skipped.
pub fn top_puestos(detalles: &[CobroDetalle]) -> Vec<TotalPorPuesto> {
    let mut totales: Vec<TotalPorPuesto> = Vec::new();
    for detalle in detalles {
        let Some(numero) = detalle.numero_puesto() else {
            continue;
        };
        match totales.iter_mut().find(|t| t.numero_puesto == numero) {
            Some(entrada) => entrada.total += detalle.cobro.monto_cobrado,
            None => totales.push(TotalPorPuesto {
                numero_puesto: numero.to_string(),
                total: detalle.cobro.monto_cobrado,
            }),
        }
    }

    // Stable sort preserves first-encountered order among ties
    totales.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
    totales.truncate(5);
    totales
}

/// Summed amounts per merchant, descending. Payments whose stall has no
/// merchant are excluded.
pub fn totales_por_comerciante(detalles: &[CobroDetalle]) -> Vec<TotalPorComerciante> {
    let mut totales: Vec<TotalPorComerciante> = Vec::new();
    for detalle in detalles {
        let Some(nombre) = detalle.nombre_comerciante() else {
            continue;
        };
        match totales.iter_mut().find(|t| t.nombre_comerciante == nombre) {
            Some(entrada) => entrada.total += detalle.cobro.monto_cobrado,
            None => totales.push(TotalPorComerciante {
                nombre_comerciante: nombre.to_string(),
                total: detalle.cobro.monto_cobrado,
            }),
        }
    }

    totales.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
    totales
}

/// The scalar aggregates bundled for the dashboard
pub fn resumen(cobros: &[Cobro], hoy: NaiveDate) -> ResumenCobros {
    ResumenCobros {
        total_hoy: total_hoy(cobros, hoy),
        total_semana: total_semana(cobros, hoy),
        total_mes: total_mes(cobros, hoy),
        total_general: total_general(cobros),
        promedio_diario: promedio_diario(cobros),
        variacion_anual: variacion_anual(cobros, hoy),
    }
}

/// `resumen` evaluated at the device's current date
pub fn resumen_actual(cobros: &[Cobro]) -> ResumenCobros {
    resumen(cobros, Local::now().date_naive())
}
