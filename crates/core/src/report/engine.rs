use std::sync::Arc;

use chrono::NaiveDate;
use futures::try_join;
use indexmap::IndexMap;
use tracing::debug;

use super::registry::{self, Band, MetricSpec, Plan, TimelineDimension};
use super::{AveSummary, ShapedMetric};
use crate::card::CardFormatter;
use crate::config::PulseConfig;
use crate::context::RequestContext;
use crate::engine::SearchEngine;
use crate::executor::{AggregationExecutor, IndexTarget};
use crate::query::{
    build_sub_topic_query_string, build_touch_point_query_string, compose_topic_query,
    compose_touch_point_query, fields, Clause, Phrases, QueryExpression, QueryOptions,
};
use crate::shaper::{
    category_map, date_series, dimension_counts, group_counts, percentage_triple, pipe_series,
    pipe_series_with_pct, sort_desc, CategoryMap,
};
use crate::sources::{BLOG_ALIASES, CHANNEL_SOURCES, NEWS_ALIASES, REVIEW_SOURCES, WEB_ALIASES};
use crate::store::{LookupStore, WordCloudKey};
use crate::template::{
    count_template, date_histogram_template, filters_template, polarity_filters, range_template,
    search_template, sentiment_filters, terms_template, Aggregation, HistogramSpec, RangeBounds,
    AGG_POLARITY, AGG_TERMS, AGG_TIMELINE,
};
use crate::types::{DateRange, Family, ReportRequest, Topic};
use crate::wordcloud::{CachePolicy, WordCloudService};
use crate::{PulseError, Result};

/// Media value per social mention
pub const AVE_SOCIAL_MULTIPLIER: f64 = 735.76;
/// Media value per print mention
pub const AVE_PRINT_MULTIPLIER: f64 = 3276.45;

const SENTIMENT_LABELS: &[&str] = &["Positive", "Negative", "Neutral"];
const SENTIMENT_DIMENSIONS: &[&str] = &["positive", "negative", "neutral"];
const POLARITY_DIMENSIONS: &[&str] = &["positive", "negative"];

const WEB_CHANNEL: &str = "Web";
const BLOG_BUCKET: &str = "Blog";
const NEWS_BUCKET: &str = "News";

fn sentiment_clause(label: &str) -> Clause {
    Clause::field(fields::SENTIMENT, Phrases::any([label]))
}

fn source_clause<I, S>(sources: I) -> Clause
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Clause::field(fields::SOURCE, Phrases::any(sources))
}

/// Hashtags then keywords, without duplicates
fn breakdown_terms(topic: &Topic) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in topic.hashtag_terms().into_iter().chain(topic.keyword_terms()) {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Histogram bounds, when both ends of the range are calendar dates
fn extended_bounds(range: &DateRange) -> Option<(String, String)> {
    let parse = |raw: &str| {
        raw.get(..10)
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
    };
    let gte = parse(&range.gte)?;
    let lte = parse(&range.lte)?;
    Some((
        gte.format("%Y-%m-%d").to_string(),
        lte.format("%Y-%m-%d").to_string(),
    ))
}

fn count_of(counts: &IndexMap<String, u64>, name: &str) -> u64 {
    counts.get(name).copied().unwrap_or(0)
}

/// Runs registered metrics for the report families.
pub struct ReportEngine {
    executor: Arc<AggregationExecutor>,
    store: Arc<dyn LookupStore>,
    cards: CardFormatter,
    word_clouds: WordCloudService,
    feed_size: u64,
}

impl ReportEngine {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        store: Arc<dyn LookupStore>,
        config: &PulseConfig,
    ) -> Self {
        let executor = Arc::new(AggregationExecutor::new(engine, &config.search));
        Self::with_executor(executor, store, config)
    }

    pub fn with_executor(
        executor: Arc<AggregationExecutor>,
        store: Arc<dyn LookupStore>,
        config: &PulseConfig,
    ) -> Self {
        Self {
            cards: CardFormatter::new(store.clone()),
            word_clouds: WordCloudService::new(
                executor.clone(),
                store.clone(),
                config.word_cloud.clone(),
            ),
            feed_size: config.feed.page_size,
            executor,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn LookupStore> {
        &self.store
    }

    /// Build the request context: topic query with filter overrides, then
    /// sub-topic and touch-point scopes appended with `AND`.
    pub async fn prepare(&self, request: &ReportRequest) -> Result<RequestContext> {
        request.range.validate()?;
        if let Some(filters) = &request.filters {
            filters.validate()?;
        }

        let options =
            QueryOptions::new(request.scad, request.tab).filters(request.filters.as_ref());
        let topic = self.store.topic(request.topic_id).await?;
        let mut query = match &topic {
            Some(topic) => compose_topic_query(topic, &options),
            None => {
                debug!(topic_id = request.topic_id, "topic not found, using empty query");
                QueryExpression::new()
            }
        };

        if let Some(sub_topic_id) = request.sub_topic_id {
            let scope = build_sub_topic_query_string(&*self.store, sub_topic_id).await?;
            query = query.and_expr(&scope);
        }
        if let Some(touchpoint_id) = request.touchpoint_id {
            let scope = build_touch_point_query_string(&*self.store, touchpoint_id).await?;
            query = query.and_expr(&scope);
        }

        Ok(RequestContext::from_request(request, query).with_topic(topic))
    }

    pub async fn run(&self, family: Family, request: &ReportRequest) -> Result<ShapedMetric> {
        let spec = registry::lookup(family, &request.metric).ok_or_else(|| {
            PulseError::validation(format!(
                "Unknown metric type '{}' for {} reports",
                request.metric, family
            ))
        })?;

        let ctx = self.prepare(request).await?;
        debug!(
            metric = spec.name,
            %family,
            topic_id = ctx.topic_id(),
            query = ctx.rendered(),
            "running metric"
        );
        self.execute(spec, &ctx).await
    }

    pub async fn execute(&self, spec: &MetricSpec, ctx: &RequestContext) -> Result<ShapedMetric> {
        match spec.plan {
            Plan::Total => self.total(ctx).await,
            Plan::SentimentSummary => self.sentiment_summary(ctx).await,
            Plan::Polarity => self.polarity(ctx).await,
            Plan::ChannelSource => Ok(self.channel_source(ctx).await),
            Plan::ChannelSentiment => Ok(self.channel_sentiment(ctx).await),
            Plan::KeywordBreakdown => self.keyword_breakdown(ctx).await,
            Plan::TouchpointBreakdown => self.touchpoint_breakdown(ctx).await,
            Plan::Timeline(dimension) => self.timeline(ctx, dimension).await,
            Plan::TermSeries {
                field,
                size,
                with_pct,
            } => self.term_series(ctx, field, size, with_pct).await,
            Plan::RangeBands { field, bands } => Ok(self.range_bands(ctx, field, bands).await),
            Plan::TermSentiment { field, size } => self.term_sentiment(ctx, field, size).await,
            Plan::Posts => self.posts(ctx).await,
            Plan::WordCloud => self.word_cloud(ctx).await,
            Plan::Ave => self.ave(ctx).await,
            Plan::ReviewSources => self.review_sources(ctx).await,
        }
    }

    async fn total(&self, ctx: &RequestContext) -> Result<ShapedMetric> {
        let count = self
            .executor
            .count(&count_template(ctx.rendered(), ctx.range()))
            .await?;
        Ok(ShapedMetric::Count { count })
    }

    async fn sentiment_summary(&self, ctx: &RequestContext) -> Result<ShapedMetric> {
        let positive = count_template(&ctx.narrowed([sentiment_clause("Positive")]), ctx.range());
        let negative = count_template(&ctx.narrowed([sentiment_clause("Negative")]), ctx.range());
        let total = count_template(ctx.rendered(), ctx.range());

        let (positive, negative, total) = try_join!(
            self.executor.count(&positive),
            self.executor.count(&negative),
            self.executor.count(&total)
        )?;
        Ok(ShapedMetric::Percentages(percentage_triple(
            positive, negative, total,
        )))
    }

    async fn polarity(&self, ctx: &RequestContext) -> Result<ShapedMetric> {
        let request = filters_template(
            ctx.rendered(),
            ctx.range(),
            AGG_POLARITY,
            polarity_filters(),
        );
        let response = self.executor.search(&request).await?;
        let counts = dimension_counts(response.aggregation(AGG_POLARITY), POLARITY_DIMENSIONS);
        let positive = count_of(&counts, "positive");
        let negative = count_of(&counts, "negative");
        Ok(ShapedMetric::Polarity {
            positive,
            negative,
            total: positive + negative,
        })
    }

    async fn channel_source(&self, ctx: &RequestContext) -> ShapedMetric {
        let mut items: Vec<(&str, _)> = CHANNEL_SOURCES
            .iter()
            .map(|source| {
                let clause = if *source == WEB_CHANNEL {
                    source_clause(WEB_ALIASES.iter().copied())
                } else {
                    source_clause([*source])
                };
                (*source, count_template(&ctx.narrowed([clause]), ctx.range()))
            })
            .collect();
        items.push((
            BLOG_BUCKET,
            count_template(
                &ctx.narrowed([source_clause(BLOG_ALIASES.iter().copied())]),
                ctx.range(),
            ),
        ));
        items.push((
            NEWS_BUCKET,
            count_template(
                &ctx.narrowed([source_clause(NEWS_ALIASES.iter().copied())]),
                ctx.range(),
            ),
        ));

        let results = self.executor.fan_out_counts(items).await;
        let count = |label: &str| {
            results
                .iter()
                .find(|(l, _)| *l == label)
                .map(|(_, count)| *count)
                .unwrap_or(0)
        };

        // Forum, blog and news volume is reported under the web channel.
        let folded = count(BLOG_BUCKET) + count(NEWS_BUCKET);
        let series: Vec<(&str, u64)> = CHANNEL_SOURCES
            .iter()
            .map(|source| {
                let mut total = count(*source);
                if *source == WEB_CHANNEL {
                    total += folded;
                }
                (*source, total)
            })
            .collect();

        ShapedMetric::Series {
            series: pipe_series(&series),
        }
    }

    async fn channel_sentiment(&self, ctx: &RequestContext) -> ShapedMetric {
        let items: Vec<_> = CHANNEL_SOURCES
            .iter()
            .flat_map(|source| {
                SENTIMENT_LABELS.iter().map(move |label| {
                    let query = ctx.narrowed([source_clause([*source]), sentiment_clause(label)]);
                    (
                        (source.to_string(), label.to_lowercase()),
                        count_template(&query, ctx.range()),
                    )
                })
            })
            .collect();

        let results = self.executor.fan_out_counts(items).await;
        ShapedMetric::Categories(group_counts(results))
    }

    async fn keyword_breakdown(&self, ctx: &RequestContext) -> Result<ShapedMetric> {
        let terms = ctx.topic().map(breakdown_terms).unwrap_or_default();

        let items: Vec<_> = terms
            .into_iter()
            .map(|term| {
                let query = ctx.narrowed([Clause::field(
                    fields::MESSAGE_TEXT,
                    Phrases::any([term.as_str()]),
                )]);
                (term, count_template(&query, ctx.range()))
            })
            .collect();

        let results = sort_desc(self.executor.fan_out_counts(items).await);
        Ok(ShapedMetric::Series {
            series: pipe_series(&results),
        })
    }

    async fn touchpoint_breakdown(&self, ctx: &RequestContext) -> Result<ShapedMetric> {
        let points = self.store.touch_points_for_topic(ctx.topic_id()).await?;

        let items: Vec<_> = points
            .iter()
            .filter_map(|point| {
                let scope = compose_touch_point_query(point);
                if scope.is_empty() {
                    return None;
                }
                Some((
                    point.name.clone(),
                    count_template(&ctx.narrowed_by(&scope), ctx.range()),
                ))
            })
            .collect();

        let results = sort_desc(self.executor.fan_out_counts(items).await);
        Ok(ShapedMetric::Series {
            series: pipe_series(&results),
        })
    }

    async fn timeline(
        &self,
        ctx: &RequestContext,
        dimension: TimelineDimension,
    ) -> Result<ShapedMetric> {
        let (filters, dimensions) = match dimension {
            TimelineDimension::Sentiment => (sentiment_filters(SENTIMENT_LABELS), SENTIMENT_DIMENSIONS),
            TimelineDimension::Polarity => (polarity_filters(), POLARITY_DIMENSIONS),
        };
        let histogram = HistogramSpec {
            calendar_interval: ctx.interval().calendar_interval().to_string(),
            extended_bounds: extended_bounds(ctx.range()),
        };

        let request = date_histogram_template(
            ctx.rendered(),
            ctx.range(),
            histogram,
            Aggregation::Filters { filters },
        );
        let response = self.executor.search(&request).await?;
        Ok(ShapedMetric::Timeline(date_series(
            &response.histogram_buckets(AGG_TIMELINE),
            dimensions,
        )))
    }

    async fn term_series(
        &self,
        ctx: &RequestContext,
        field: &str,
        size: u64,
        with_pct: bool,
    ) -> Result<ShapedMetric> {
        let request = terms_template(ctx.rendered(), ctx.range(), AGG_TERMS, field, size, None);
        let response = self.executor.search(&request).await?;
        let items = sort_desc(
            response
                .term_buckets(AGG_TERMS)
                .into_iter()
                .map(|bucket| (bucket.key, bucket.doc_count))
                .collect(),
        );

        let series = if with_pct {
            pipe_series_with_pct(&items)
        } else {
            pipe_series(&items)
        };
        Ok(ShapedMetric::Series { series })
    }

    async fn range_bands(&self, ctx: &RequestContext, field: &str, bands: &[Band]) -> ShapedMetric {
        let items: Vec<_> = bands
            .iter()
            .map(|band| {
                (
                    band.label,
                    range_template(
                        ctx.rendered(),
                        ctx.range(),
                        field,
                        RangeBounds::band(band.gte, band.lt),
                    ),
                )
            })
            .collect();

        let results = self.executor.fan_out_counts(items).await;
        ShapedMetric::Categories(category_map(results.into_iter().map(|(label, count)| {
            (
                label.to_string(),
                IndexMap::from([("count".to_string(), count)]),
            )
        })))
    }

    async fn term_sentiment(
        &self,
        ctx: &RequestContext,
        field: &str,
        size: u64,
    ) -> Result<ShapedMetric> {
        let request = terms_template(
            ctx.rendered(),
            ctx.range(),
            AGG_TERMS,
            field,
            size,
            Some(Aggregation::Filters {
                filters: sentiment_filters(SENTIMENT_LABELS),
            }),
        );
        let response = self.executor.search(&request).await?;
        let entries = response
            .term_buckets(AGG_TERMS)
            .into_iter()
            .map(|bucket| (bucket.key, dimension_counts(&bucket.sub, SENTIMENT_DIMENSIONS)));
        Ok(ShapedMetric::Categories(category_map(entries)))
    }

    async fn posts(&self, ctx: &RequestContext) -> Result<ShapedMetric> {
        let request = search_template(ctx.rendered(), ctx.range(), self.feed_size);
        let response = self.executor.search(&request).await?;
        Ok(ShapedMetric::Cards(self.cards.format(&response.hits).await))
    }

    async fn word_cloud(&self, ctx: &RequestContext) -> Result<ShapedMetric> {
        let key = ctx
            .sub_topic_id()
            .map(WordCloudKey::SubTopic)
            .unwrap_or(WordCloudKey::Topic(ctx.topic_id()));
        let policy = if ctx.touchpoint_id().is_some() || ctx.scad() {
            CachePolicy::Bypass
        } else if ctx.filters().is_some() {
            CachePolicy::Refresh
        } else {
            CachePolicy::Use
        };
        let cloud = self
            .word_clouds
            .cloud(key, ctx.rendered(), ctx.range(), policy)
            .await?;
        Ok(ShapedMetric::WordCloud(cloud))
    }

    async fn ave(&self, ctx: &RequestContext) -> Result<ShapedMetric> {
        let request = count_template(ctx.rendered(), ctx.range());
        let (social, print) = try_join!(
            self.executor.count(&request),
            self.executor.count_in(IndexTarget::Print, &request)
        )?;
        let ave = social as f64 * AVE_SOCIAL_MULTIPLIER + print as f64 * AVE_PRINT_MULTIPLIER;
        Ok(ShapedMetric::Ave(AveSummary {
            social_mentions: social,
            print_mentions: print,
            ave: (ave * 100.0).round() / 100.0,
        }))
    }

    async fn review_sources(&self, ctx: &RequestContext) -> Result<ShapedMetric> {
        let account_id = ctx
            .account_id()
            .ok_or_else(|| PulseError::validation("accountId is required for reviewSources"))?;

        let Some(index) = self.store.customer_review_index(account_id).await? else {
            debug!(account_id, "no review index for account");
            return Ok(ShapedMetric::Categories(CategoryMap::new()));
        };

        let base = QueryExpression::new()
            .and_field(fields::REVIEW_INDEX, Phrases::any([index.as_str()]));
        let items: Vec<_> = REVIEW_SOURCES
            .iter()
            .flat_map(|source| {
                let base = &base;
                SENTIMENT_LABELS.iter().map(move |label| {
                    let query = base
                        .clone()
                        .and(source_clause([*source]))
                        .and(sentiment_clause(label))
                        .render();
                    (
                        (source.to_string(), label.to_lowercase()),
                        count_template(&query, ctx.range()),
                    )
                })
            })
            .collect();

        let results = self.executor.fan_out_counts(items).await;
        Ok(ShapedMetric::Categories(group_counts(results)))
    }
}
