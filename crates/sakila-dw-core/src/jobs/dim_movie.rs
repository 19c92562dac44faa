//! Incremental load of the type-1 `dim_movie` dimension from `film`.

use std::collections::HashMap;

use tracing::info;

use crate::error::Result;
use crate::extract::EMPTY_WATERMARK;
use crate::jobs::{JobKind, RunOutcome, Watermark};
use crate::model::{DimMovie, Film, Language};
use crate::resolver::{log_lookup, DistinctIds};
use crate::store::{SourceStore, WarehouseStore};
use crate::validation::validate_unique_keys;

pub async fn run<S, W>(source: &S, warehouse: &W, batch_size: i64) -> Result<RunOutcome>
where
    S: SourceStore + ?Sized,
    W: WarehouseStore + ?Sized,
{
    let last_film_id = warehouse.max_film_id().await?;
    let films = source
        .films_after(last_film_id.unwrap_or(EMPTY_WATERMARK), batch_size)
        .await?;
    info!(last_film_id = ?last_film_id, rows = films.len(), "Extracted new film rows");

    let Some(new_watermark) = films.iter().map(|f| f.film_id).max() else {
        info!("No new record in source table");
        return Ok(RunOutcome::NoNewData {
            job: JobKind::DimMovie,
            watermark: last_film_id.map(Watermark::Key),
        });
    };

    let language_ids = DistinctIds::collect(films.iter().map(|f| f.language_id));
    let languages = match language_ids.non_empty() {
        Some(ids) => source.languages(ids).await?,
        None => Vec::new(),
    };
    log_lookup("language", &language_ids, languages.len());

    let movies = join_film_language(&films, &languages);
    validate_unique_keys("dim_movie", movies.iter().map(|row| row.film_id))?;

    let appended = warehouse.append_movies(&movies).await?;
    info!(rows = appended, watermark = new_watermark, "Loaded dim_movie");

    Ok(RunOutcome::Loaded {
        job: JobKind::DimMovie,
        rows: appended,
        previous_watermark: last_film_id.map(Watermark::Key),
        watermark: Watermark::Key(new_watermark),
    })
}

pub fn join_film_language(films: &[Film], languages: &[Language]) -> Vec<DimMovie> {
    let names: HashMap<i64, &str> = languages
        .iter()
        .map(|language| (language.language_id, language.name.as_str()))
        .collect();

    films
        .iter()
        .map(|film| DimMovie {
            film_id: film.film_id,
            title: film.title.clone(),
            description: film.description.clone(),
            release_year: film.release_year,
            language: film
                .language_id
                .and_then(|id| names.get(&id))
                .map(|name| name.to_string()),
            rental_duration: film.rental_duration,
            length: film.length,
            rating: film.rating.clone(),
            special_features: film.special_features.clone(),
        })
        .collect()
}
