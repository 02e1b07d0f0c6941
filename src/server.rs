use crate::builders;
use crate::chart::ChartSpec;
use crate::data::{Table, COL_GENRE};
use crate::filters::{self, GenreSelection, ALL_GENRES};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Fixed bounds of the price range control.
pub const MIN_PRICE: f64 = 25.0;
pub const MAX_PRICE: f64 = 327.0;
pub const PRICE_STEP: f64 = 10.0;

/// Shared application state: the cleaned table plus the chart specs that
/// never change after startup.
#[derive(Clone)]
pub struct AppState {
    table: Arc<Table>,
    overview: Arc<Overview>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SliderBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Everything the page needs on first load: dropdown options, slider
/// bounds, the five static charts and the initial state of the two dynamic
/// ones.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub genres: Vec<String>,
    pub price_slider: SliderBounds,
    pub histogram: ChartSpec,
    pub scatter: ChartSpec,
    pub heatmap: ChartSpec,
    pub top_brands: ChartSpec,
    pub price_bands: ChartSpec,
    pub discount_density: ChartSpec,
    pub regression: ChartSpec,
}

impl AppState {
    /// Build all startup charts. The pie builder's band-column insertion
    /// happens here, before the table is wrapped for sharing; afterwards
    /// the table is read-only for the process lifetime.
    pub fn new(mut table: Table) -> Result<Self> {
        let heatmap = builders::correlation_heatmap(&table)
            .context("Failed to build correlation heatmap")?;
        let top_brands =
            builders::top_brands_bar(&table).context("Failed to build top brands chart")?;
        let discount_density =
            builders::discount_density(&table).context("Failed to build discount density chart")?;
        let regression = builders::price_discount_regression(&table)
            .context("Failed to build regression chart")?;
        let price_bands =
            builders::price_band_pie(&mut table).context("Failed to build price band chart")?;

        let histogram = filters::histogram_for_genre(&table, &GenreSelection::All)
            .context("Failed to build initial histogram")?;
        let scatter = filters::scatter_for_price_range(&table, MIN_PRICE, MAX_PRICE)
            .context("Failed to build initial scatter")?;

        let mut genres = vec![ALL_GENRES.to_string()];
        genres.extend(table.distinct_text(COL_GENRE)?);

        let overview = Overview {
            genres,
            price_slider: SliderBounds {
                min: MIN_PRICE,
                max: MAX_PRICE,
                step: PRICE_STEP,
            },
            histogram,
            scatter,
            heatmap,
            top_brands,
            price_bands,
            discount_density,
            regression,
        };

        Ok(Self {
            table: Arc::new(table),
            overview: Arc::new(overview),
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn overview(&self) -> &Overview {
        &self.overview
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/overview", get(overview))
        .route("/api/histogram", get(histogram))
        .route("/api/scatter", get(scatter))
        .with_state(state)
}

/// Bind and serve until externally stopped.
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("dashboard listening on http://{addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn overview(State(state): State<AppState>) -> Json<Overview> {
    Json((*state.overview).clone())
}

#[derive(Debug, Deserialize)]
struct HistogramParams {
    genre: Option<String>,
}

async fn histogram(
    State(state): State<AppState>,
    Query(params): Query<HistogramParams>,
) -> Response {
    let selection = GenreSelection::parse(params.genre.as_deref().unwrap_or(ALL_GENRES));
    match filters::histogram_for_genre(state.table(), &selection) {
        Ok(spec) => Json(spec).into_response(),
        Err(err) => {
            tracing::error!(%err, "histogram rebuild failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScatterParams {
    min: Option<f64>,
    max: Option<f64>,
}

async fn scatter(State(state): State<AppState>, Query(params): Query<ScatterParams>) -> Response {
    let min = params.min.unwrap_or(MIN_PRICE);
    let max = params.max.unwrap_or(MAX_PRICE);
    match filters::scatter_for_price_range(state.table(), min, max) {
        Ok(spec) => Json(spec).into_response(),
        Err(err) => {
            tracing::error!(%err, "scatter rebuild failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

const INDEX_HTML: &str = r##"<!doctype html>
<html lang="pt-BR">
  <head>
    <meta charset="utf-8" />
    <title>Dashboard Interativo de E-commerce</title>
    <script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
    <style>
      body { font-family: system-ui, sans-serif; margin: 0; padding: 20px; background: #fff; color: #222; }
      h1 { text-align: center; }
      .filtro { padding: 20px; border: 1px solid #ccc; margin-bottom: 20px; }
      .filtro h3 { margin-top: 0; }
      .linha { display: flex; flex-wrap: wrap; }
      .linha .grafico { width: 50%; min-width: 420px; }
      select { min-width: 240px; padding: 4px; }
      .faixa-controle { display: flex; align-items: center; gap: 12px; margin: 12px 0; }
      .faixa-controle input[type="range"] { flex: 1; }
      #faixa-valor { min-width: 140px; font-weight: 600; }
    </style>
  </head>
  <body>
    <h1>Dashboard Interativo de E-commerce</h1>

    <div class="filtro">
      <h3>Filtro 1: Distribuição de Notas por Gênero/Categoria</h3>
      <label for="genero-dropdown">Selecione um Gênero/Categoria para filtrar o Histograma de Notas:</label><br />
      <select id="genero-dropdown"></select>
      <div id="histograma"></div>
    </div>

    <div class="filtro">
      <h3>Filtro 2: Relação Preço vs Nota por Faixa de Preço</h3>
      <label>Selecione uma Faixa de Preço (R$):</label>
      <div class="faixa-controle">
        <input type="range" id="preco-min" />
        <input type="range" id="preco-max" />
        <span id="faixa-valor"></span>
      </div>
      <div id="dispersao"></div>
    </div>

    <div class="linha">
      <div class="grafico" id="correlacao"></div>
      <div class="grafico" id="marcas"></div>
    </div>
    <div class="linha">
      <div class="grafico" id="faixas"></div>
      <div class="grafico" id="densidade"></div>
    </div>
    <div class="linha">
      <div class="grafico" id="regressao"></div>
    </div>

    <script>
      function binCenters(edges) {
        const centers = [];
        for (let i = 0; i + 1 < edges.length; i++) {
          centers.push((edges[i] + edges[i + 1]) / 2);
        }
        return centers;
      }

      // Turn a renderer-agnostic chart spec into Plotly traces + layout.
      function interpret(spec) {
        const layout = {
          title: { text: spec.title },
          plot_bgcolor: "white",
          xaxis: { showgrid: true, gridcolor: "lightgray" },
          yaxis: { showgrid: true, gridcolor: "lightgray" },
        };
        switch (spec.kind) {
          case "histogram": {
            const centers = binCenters(spec.bin_edges);
            const data = spec.series.map((s) => ({
              type: "bar",
              name: s.name,
              x: centers,
              y: s.counts,
              marker: { color: s.color },
              opacity: 0.75,
            }));
            layout.barmode = "overlay";
            layout.bargap = spec.bar_gap;
            layout.xaxis.title = { text: spec.x_label };
            layout.yaxis.title = { text: spec.y_label };
            return { data, layout };
          }
          case "scatter": {
            const data = spec.series.map((s) => ({
              type: "scatter",
              mode: "markers",
              name: s.name,
              x: s.x,
              y: s.y,
              text: s.hover,
              marker: { color: s.color },
            }));
            layout.xaxis.gridcolor = "lightgreen";
            layout.yaxis.gridcolor = "lightgreen";
            layout.xaxis.title = { text: spec.x_label };
            layout.yaxis.title = { text: spec.y_label };
            layout.legend = { title: { text: "Gênero" } };
            return { data, layout };
          }
          case "heatmap": {
            const trace = {
              type: "heatmap",
              z: spec.matrix,
              x: spec.columns,
              y: spec.columns,
              colorscale: spec.color_scale,
            };
            if (spec.annotate) {
              trace.texttemplate = "%{z}";
            }
            return { data: [trace], layout };
          }
          case "bar": {
            const data = [{
              type: "bar",
              x: spec.categories,
              y: spec.values,
              text: spec.values.map((v) => v.toFixed(0)),
              textposition: spec.labels_outside ? "outside" : "auto",
              marker: { color: spec.colors },
            }];
            layout.showlegend = false;
            layout.xaxis.showgrid = false;
            layout.xaxis.title = { text: spec.x_label };
            layout.yaxis.title = { text: spec.y_label };
            return { data, layout };
          }
          case "pie": {
            const data = [{
              type: "pie",
              labels: spec.labels,
              values: spec.values,
              hole: spec.hole,
              textinfo: spec.text_info,
              textfont: { size: 13 },
              marker: { colors: spec.colors },
            }];
            return { data, layout };
          }
          case "density": {
            const data = [
              {
                type: "scatter",
                mode: "lines",
                x: spec.x,
                y: spec.y,
                line: { color: spec.line_color },
              },
              {
                type: "scatter",
                mode: "none",
                fill: "tozeroy",
                fillcolor: spec.fill_color,
                x: spec.x,
                y: spec.y,
              },
            ];
            layout.showlegend = false;
            layout.xaxis.title = { text: spec.x_label };
            layout.yaxis.title = { text: spec.y_label };
            return { data, layout };
          }
          case "regression": {
            const data = [
              {
                type: "scatter",
                mode: "markers",
                name: spec.points.name,
                x: spec.points.x,
                y: spec.points.y,
                marker: { color: spec.points.color },
              },
              {
                type: "scatter",
                mode: "lines",
                name: "OLS",
                x: spec.trend_x,
                y: spec.trend_y,
                line: { color: spec.trend_color },
              },
            ];
            layout.showlegend = false;
            layout.xaxis.title = { text: spec.x_label };
            layout.yaxis.title = { text: spec.y_label };
            return { data, layout };
          }
          default:
            return { data: [], layout };
        }
      }

      function render(divId, spec) {
        const { data, layout } = interpret(spec);
        Plotly.newPlot(divId, data, layout, { responsive: true });
      }

      const minInput = document.getElementById("preco-min");
      const maxInput = document.getElementById("preco-max");
      const rangeLabel = document.getElementById("faixa-valor");
      const dropdown = document.getElementById("genero-dropdown");

      function activeRange() {
        let lo = Number(minInput.value);
        let hi = Number(maxInput.value);
        if (lo > hi) {
          [lo, hi] = [hi, lo];
        }
        return [lo, hi];
      }

      function updateRangeLabel() {
        const [lo, hi] = activeRange();
        rangeLabel.textContent = "R$" + lo + " – R$" + hi;
      }

      async function refreshHistogram() {
        const res = await fetch("/api/histogram?genre=" + encodeURIComponent(dropdown.value));
        render("histograma", await res.json());
      }

      async function refreshScatter() {
        const [lo, hi] = activeRange();
        const res = await fetch("/api/scatter?min=" + lo + "&max=" + hi);
        render("dispersao", await res.json());
      }

      async function boot() {
        const res = await fetch("/api/overview");
        const ov = await res.json();

        for (const genre of ov.genres) {
          const option = document.createElement("option");
          option.value = genre;
          option.textContent = genre;
          dropdown.appendChild(option);
        }

        for (const input of [minInput, maxInput]) {
          input.min = ov.price_slider.min;
          input.max = ov.price_slider.max;
          input.step = ov.price_slider.step;
        }
        minInput.value = ov.price_slider.min;
        maxInput.value = ov.price_slider.max;
        updateRangeLabel();

        render("histograma", ov.histogram);
        render("dispersao", ov.scatter);
        render("correlacao", ov.heatmap);
        render("marcas", ov.top_brands);
        render("faixas", ov.price_bands);
        render("densidade", ov.discount_density);
        render("regressao", ov.regression);

        dropdown.addEventListener("change", refreshHistogram);
        for (const input of [minInput, maxInput]) {
          input.addEventListener("input", updateRangeLabel);
          input.addEventListener("change", refreshScatter);
        }
      }

      boot();
    </script>
  </body>
</html>
"##;
