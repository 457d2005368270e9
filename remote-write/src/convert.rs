use crate::{
    proto::{
        self,
        Label,
        MetricMetadata,
        Sample,
        TimeSeries,
        WriteRequest,
    },
    RemoteWriteError,
};
use prometheus::proto::{
    MetricFamily,
    MetricType,
};

const NAME_LABEL: &str = "__name__";
const INSTANCE_LABEL: &str = "instance";
const JOB_LABEL: &str = "job";

/// Turn a gathered snapshot into a remote_write request.
///
/// Every series gets `__name__`, `instance` and `job`, the metric's own labels
/// with those names are dropped. Labels are sorted by name.
pub fn write_request(
    families: &[MetricFamily],
    instance: &str,
    job: &str,
    timestamp_ms: i64,
) -> Result<WriteRequest, RemoteWriteError> {
    let mut request = WriteRequest::default();

    for family in families {
        let name = family.get_name();
        let kind = family.get_field_type();
        let metadata_type = match kind {
            MetricType::GAUGE => proto::MetricType::Gauge,
            MetricType::COUNTER => proto::MetricType::Counter,
            MetricType::UNTYPED => proto::MetricType::Unknown,
            _ => {
                return Err(RemoteWriteError::UnsupportedMetricType {
                    name: name.to_string(),
                    kind,
                })
            }
        };

        request.metadata.push(MetricMetadata {
            r#type: metadata_type as i32,
            metric_family_name: name.to_string(),
            help: family.get_help().to_string(),
            unit: String::new(),
        });

        for metric in family.get_metric() {
            let value = match kind {
                MetricType::GAUGE => metric.get_gauge().get_value(),
                MetricType::COUNTER => metric.get_counter().get_value(),
                _ => metric.get_untyped().get_value(),
            };

            let mut labels = vec![
                label(NAME_LABEL, name),
                label(INSTANCE_LABEL, instance),
                label(JOB_LABEL, job),
            ];
            labels.extend(
                metric
                    .get_label()
                    .iter()
                    .filter(|l| ![NAME_LABEL, INSTANCE_LABEL, JOB_LABEL].contains(&l.get_name()))
                    .map(|l| label(l.get_name(), l.get_value())),
            );
            labels.sort_by(|a, b| a.name.cmp(&b.name));

            request.timeseries.push(TimeSeries {
                labels,
                samples: vec![Sample {
                    value,
                    timestamp: timestamp_ms,
                }],
            });
        }
    }

    Ok(request)
}

fn label(name: &str, value: &str) -> Label {
    Label {
        name: name.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{
        core::Collector as _,
        Counter,
        GaugeVec,
        Histogram,
        HistogramOpts,
        Opts,
    };

    fn names(series: &TimeSeries) -> Vec<&str> {
        series.labels.iter().map(|l| l.name.as_str()).collect()
    }

    fn value<'a>(series: &'a TimeSeries, name: &str) -> Option<&'a str> {
        series.labels.iter().find(|l| l.name == name).map(|l| l.value.as_str())
    }

    #[test]
    fn gauge_labels_are_merged_and_sorted() {
        let gauge = GaugeVec::new(Opts::new("speedtest_ping_latency_milliseconds", "Ping"), &["isp", "instance", "ip"]).unwrap();
        gauge.with_label_values(&["Foo Corp.", "metric-instance", "127.0.0.1"]).set(15.0);

        let request = write_request(&gauge.collect(), "client-instance", "speedtest", 1234).unwrap();

        assert_eq!(request.timeseries.len(), 1);
        let series = &request.timeseries[0];
        assert_eq!(names(series), vec!["__name__", "instance", "ip", "isp", "job"]);
        assert_eq!(value(series, "__name__"), Some("speedtest_ping_latency_milliseconds"));
        assert_eq!(value(series, "instance"), Some("client-instance"));
        assert_eq!(value(series, "job"), Some("speedtest"));
        assert_eq!(series.samples, vec![Sample { value: 15.0, timestamp: 1234 }]);

        assert_eq!(request.metadata.len(), 1);
        assert_eq!(request.metadata[0].r#type, proto::MetricType::Gauge as i32);
        assert_eq!(request.metadata[0].help, "Ping");
    }

    #[test]
    fn counters_are_supported() {
        let counter = Counter::new("pushes_total", "Pushes").unwrap();
        counter.inc_by(3.0);

        let request = write_request(&counter.collect(), "i", "j", 0).unwrap();

        assert_eq!(request.timeseries[0].samples[0].value, 3.0);
        assert_eq!(request.metadata[0].r#type, proto::MetricType::Counter as i32);
    }

    #[test]
    fn histograms_are_rejected() {
        let histogram = Histogram::with_opts(HistogramOpts::new("latency", "Latency")).unwrap();
        histogram.observe(1.0);

        let err = write_request(&histogram.collect(), "i", "j", 0).unwrap_err();
        assert!(matches!(err, RemoteWriteError::UnsupportedMetricType { ref name, .. } if name == "latency"));
    }

    #[test]
    fn empty_snapshot() {
        let request = write_request(&[], "i", "j", 0).unwrap();
        assert!(request.timeseries.is_empty());
        assert!(request.metadata.is_empty());
    }
}
