use crate::error::HrvError;
use crate::metrics::FeatureVector;
use crate::signal::{Events, RRSeries};
use realfft::RealFftPlanner;
use std::f64::consts::PI;

/// Fewest beats a window must contain before any metric is computed.
pub const MIN_PEAKS: usize = 3;

/// Longest beat-to-beat interval accepted, in milliseconds.
pub const MAX_RR_MS: f64 = 10_000.0;

const VLF_BAND: (f64, f64) = (0.0033, 0.04);
const LF_BAND: (f64, f64) = (0.04, 0.15);
const HF_BAND: (f64, f64) = (0.15, 0.4);

/// Time-domain statistics over NN intervals, all durations in milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct HRVTime {
    pub n: usize,
    pub mean_nn: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub sdsd: f64,
    pub cvnn: f64,
    pub cvsd: f64,
    pub median_nn: f64,
    pub mad_nn: f64,
    pub mcvnn: f64,
    pub iqr_nn: f64,
    /// Percentage of successive differences above 50 ms.
    pub pnn50: f64,
    pub pnn20: f64,
    pub min_nn: f64,
    pub max_nn: f64,
}

/// Welch band powers in ms².
#[derive(Debug, Clone, Copy)]
pub struct HRVPsd {
    pub vlf: f64,
    pub lf: f64,
    pub hf: f64,
    pub total_power: f64,
    pub lf_hf: f64,
    pub lfn: f64,
    pub hfn: f64,
    pub ln_hf: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct HRVNonlinear {
    pub sd1: f64,
    pub sd2: f64,
    pub sd1_sd2: f64,
    pub ellipse_area: f64,
    pub csi: f64,
    pub cvi: f64,
    pub samp_entropy: f64,
    pub dfa_alpha1: f64,
}

/// Full HRV battery for one run of beats sampled at `fs`.
pub fn hrv_features(peaks: &Events, fs: f64, interp_fs: f64) -> Result<FeatureVector, HrvError> {
    if !(fs.is_finite() && fs > 0.0) {
        return Err(HrvError::InvalidSamplingRate(fs));
    }
    if peaks.is_empty() {
        return Err(HrvError::NoPeaks);
    }
    if peaks.len() < MIN_PEAKS {
        return Err(HrvError::TooFewBeats {
            found: peaks.len(),
            required: MIN_PEAKS,
        });
    }
    let rr = RRSeries::from_events(peaks, fs);
    // Bounds the resampled tachogram length.
    if let Some(&bad) = rr.rr.iter().find(|v| **v > MAX_RR_MS) {
        return Err(HrvError::ImplausibleInterval(bad));
    }
    let time = hrv_time(&rr);
    let psd = hrv_psd(&rr, interp_fs);
    let nonlinear = hrv_nonlinear(&rr);

    let mut out = FeatureVector::new();
    out.push("HRV_MeanNN", time.mean_nn);
    out.push("HRV_SDNN", time.sdnn);
    out.push("HRV_RMSSD", time.rmssd);
    out.push("HRV_SDSD", time.sdsd);
    out.push("HRV_CVNN", time.cvnn);
    out.push("HRV_CVSD", time.cvsd);
    out.push("HRV_MedianNN", time.median_nn);
    out.push("HRV_MadNN", time.mad_nn);
    out.push("HRV_MCVNN", time.mcvnn);
    out.push("HRV_IQRNN", time.iqr_nn);
    out.push("HRV_pNN50", time.pnn50);
    out.push("HRV_pNN20", time.pnn20);
    out.push("HRV_MinNN", time.min_nn);
    out.push("HRV_MaxNN", time.max_nn);
    out.push("HRV_VLF", psd.vlf);
    out.push("HRV_LF", psd.lf);
    out.push("HRV_HF", psd.hf);
    out.push("HRV_TP", psd.total_power);
    out.push("HRV_LFHF", psd.lf_hf);
    out.push("HRV_LFn", psd.lfn);
    out.push("HRV_HFn", psd.hfn);
    out.push("HRV_LnHF", psd.ln_hf);
    out.push("HRV_SD1", nonlinear.sd1);
    out.push("HRV_SD2", nonlinear.sd2);
    out.push("HRV_SD1SD2", nonlinear.sd1_sd2);
    out.push("HRV_S", nonlinear.ellipse_area);
    out.push("HRV_CSI", nonlinear.csi);
    out.push("HRV_CVI", nonlinear.cvi);
    out.push("HRV_SampEn", nonlinear.samp_entropy);
    out.push("HRV_DFA_alpha1", nonlinear.dfa_alpha1);
    Ok(out)
}

pub fn hrv_time(rr: &RRSeries) -> HRVTime {
    let n = rr.len();
    let mean_nn = mean(&rr.rr);
    let sdnn = std_dev(&rr.rr);
    let diffs: Vec<f64> = rr.rr.windows(2).map(|w| w[1] - w[0]).collect();
    let rmssd = if diffs.is_empty() {
        f64::NAN
    } else {
        (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt()
    };
    let sdsd = std_dev(&diffs);

    let mut sorted = rr.rr.clone();
    sorted.sort_by(f64::total_cmp);
    let median_nn = quantile(&sorted, 0.5);
    let mut deviations: Vec<f64> = sorted.iter().map(|x| (x - median_nn).abs()).collect();
    deviations.sort_by(f64::total_cmp);
    // Scaled to be consistent with the standard deviation of a normal distribution.
    let mad_nn = 1.4826 * quantile(&deviations, 0.5);
    let iqr_nn = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);

    HRVTime {
        n,
        mean_nn,
        sdnn,
        rmssd,
        sdsd,
        cvnn: ratio(sdnn, mean_nn),
        cvsd: ratio(rmssd, mean_nn),
        median_nn,
        mad_nn,
        mcvnn: ratio(mad_nn, median_nn),
        iqr_nn,
        pnn50: percent_above(&diffs, 50.0),
        pnn20: percent_above(&diffs, 20.0),
        min_nn: sorted.first().copied().unwrap_or(f64::NAN),
        max_nn: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

pub fn hrv_psd(rr: &RRSeries, fs_interp: f64) -> HRVPsd {
    let (freqs, powers) = welch_psd(rr, fs_interp);
    let df = if freqs.len() > 1 { freqs[1] - freqs[0] } else { 0.0 };
    let vlf = band_power(&freqs, &powers, VLF_BAND, df);
    let lf = band_power(&freqs, &powers, LF_BAND, df);
    let hf = band_power(&freqs, &powers, HF_BAND, df);
    let total_power = vlf + lf + hf;
    HRVPsd {
        vlf,
        lf,
        hf,
        total_power,
        lf_hf: ratio(lf, hf),
        lfn: ratio(lf, total_power),
        hfn: ratio(hf, total_power),
        ln_hf: if hf > 0.0 { hf.ln() } else { f64::NAN },
    }
}

pub fn hrv_nonlinear(rr: &RRSeries) -> HRVNonlinear {
    let sdnn = std_dev(&rr.rr);
    let diffs: Vec<f64> = rr.rr.windows(2).map(|w| w[1] - w[0]).collect();
    let sd1 = (std_dev(&diffs).powi(2) / 2.0).sqrt();
    let sd2 = (2.0 * sdnn * sdnn - sd1 * sd1).max(0.0).sqrt();
    let tolerance = 0.2 * sdnn;
    HRVNonlinear {
        sd1,
        sd2,
        sd1_sd2: ratio(sd1, sd2),
        ellipse_area: PI * sd1 * sd2,
        csi: ratio(sd2, sd1),
        cvi: if sd1 > 0.0 && sd2 > 0.0 {
            (16.0 * sd1 * sd2).log10()
        } else {
            f64::NAN
        },
        samp_entropy: if tolerance > 0.0 {
            sample_entropy(&rr.rr, 2, tolerance)
        } else {
            f64::NAN
        },
        dfa_alpha1: dfa_alpha1(&rr.rr),
    }
}

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return f64::NAN;
    }
    let m = mean(data);
    (data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() as f64 - 1.0)).sqrt()
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 || !den.is_finite() {
        f64::NAN
    } else {
        num / den
    }
}

fn percent_above(diffs: &[f64], threshold_ms: f64) -> f64 {
    if diffs.is_empty() {
        return f64::NAN;
    }
    let count = diffs.iter().filter(|d| d.abs() > threshold_ms).count();
    100.0 * count as f64 / diffs.len() as f64
}

/// Linear-interpolated quantile of already sorted data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

fn sample_entropy(data: &[f64], m: usize, r: f64) -> f64 {
    let n = data.len();
    if n <= m + 1 {
        return f64::NAN;
    }
    let templates = n - m;
    let mut matches_m = 0u64;
    let mut matches_m1 = 0u64;
    for i in 0..templates {
        for j in (i + 1)..templates {
            let within = data[i..i + m]
                .iter()
                .zip(&data[j..j + m])
                .all(|(a, b)| (a - b).abs() < r);
            if within {
                matches_m += 1;
                if (data[i + m] - data[j + m]).abs() < r {
                    matches_m1 += 1;
                }
            }
        }
    }
    if matches_m == 0 || matches_m1 == 0 {
        f64::NAN
    } else {
        -(matches_m1 as f64 / matches_m as f64).ln()
    }
}

/// Short-term DFA scaling exponent over box sizes 4..=16 beats.
fn dfa_alpha1(rr: &[f64]) -> f64 {
    const MIN_BOX: usize = 4;
    const MAX_BOX: usize = 16;
    if rr.len() < MIN_BOX * 2 {
        return f64::NAN;
    }
    let m = mean(rr);
    let profile: Vec<f64> = rr
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v - m;
            Some(*acc)
        })
        .collect();
    let largest = MAX_BOX.min(profile.len() / 2);
    let mut fluctuations = Vec::new();
    for size in MIN_BOX..=largest {
        let residuals: Vec<f64> = profile
            .chunks_exact(size)
            .map(|segment| {
                let (slope, intercept) = linear_fit(segment);
                segment
                    .iter()
                    .enumerate()
                    .map(|(i, y)| (y - (slope * i as f64 + intercept)).powi(2))
                    .sum::<f64>()
                    / size as f64
            })
            .collect();
        if residuals.is_empty() {
            continue;
        }
        let rms = mean(&residuals).sqrt();
        if rms.is_finite() && rms > 0.0 {
            fluctuations.push(((size as f64).ln(), rms.ln()));
        }
    }
    if fluctuations.len() < 2 {
        return f64::NAN;
    }
    slope_of(&fluctuations)
}

fn linear_fit(segment: &[f64]) -> (f64, f64) {
    let points: Vec<(f64, f64)> = segment
        .iter()
        .enumerate()
        .map(|(i, y)| (i as f64, *y))
        .collect();
    let slope = slope_of(&points);
    let slope = if slope.is_finite() { slope } else { 0.0 };
    let x_mean = points.iter().map(|p| p.0).sum::<f64>() / points.len().max(1) as f64;
    let intercept = mean(segment) - slope * x_mean;
    (slope, intercept)
}

/// Least-squares slope through `(x, y)` points.
fn slope_of(points: &[(f64, f64)]) -> f64 {
    let n = points.len() as f64;
    let (sx, sy, sxx, sxy) = points.iter().fold((0.0, 0.0, 0.0, 0.0), |acc, (x, y)| {
        (acc.0 + x, acc.1 + y, acc.2 + x * x, acc.3 + x * y)
    });
    let denom = n * sxx - sx * sx;
    if denom.abs() < f64::EPSILON {
        return f64::NAN;
    }
    (n * sxy - sx * sy) / denom
}

fn band_power(freqs: &[f64], powers: &[f64], band: (f64, f64), df: f64) -> f64 {
    freqs
        .iter()
        .zip(powers)
        .filter(|(f, _)| **f >= band.0 && **f < band.1)
        .map(|(_, p)| p * df)
        .sum()
}

/// Welch periodogram (density scaling) of the RR tachogram resampled at `fs_interp`.
fn welch_psd(rr: &RRSeries, fs_interp: f64) -> (Vec<f64>, Vec<f64>) {
    let signal = resample_tachogram(rr, fs_interp);
    let n = signal.len();
    if n < 4 {
        return (Vec::new(), Vec::new());
    }
    // Long enough to resolve the lowest VLF frequency when the recording allows it.
    let window = ((2.0 / VLF_BAND.0) * fs_interp).max(4.0).min(n as f64) as usize;
    let step = (window / 2).max(1);
    let taper = hann(window);
    let taper_energy: f64 = taper.iter().map(|w| w * w).sum();
    let scale = 1.0 / (fs_interp * taper_energy);

    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(window);
    let mut spectrum = r2c.make_output_vec();
    let freqs: Vec<f64> = (0..spectrum.len())
        .map(|k| k as f64 * fs_interp / window as f64)
        .collect();
    let mut powers = vec![0.0; spectrum.len()];
    let mut segments = 0;
    let mut pos = 0;
    while pos + window <= n {
        let mut frame: Vec<f64> = signal[pos..pos + window]
            .iter()
            .zip(&taper)
            .map(|(x, w)| x * w)
            .collect();
        if r2c.process(&mut frame, &mut spectrum).is_err() {
            return (Vec::new(), Vec::new());
        }
        for (k, value) in spectrum.iter().enumerate() {
            let one_sided = k != 0 && !(window % 2 == 0 && k == window / 2);
            let factor = if one_sided { 2.0 } else { 1.0 };
            powers[k] += factor * value.norm_sqr() * scale;
        }
        segments += 1;
        pos += step;
    }
    for p in powers.iter_mut() {
        *p /= segments as f64;
    }
    (freqs, powers)
}

/// Linear interpolation of RR values placed at their beat times, mean removed.
fn resample_tachogram(rr: &RRSeries, fs: f64) -> Vec<f64> {
    if rr.len() < 2 || !(fs.is_finite() && fs > 0.0) {
        return Vec::new();
    }
    let times: Vec<f64> = rr
        .rr
        .iter()
        .scan(0.0, |acc, interval| {
            *acc += interval / 1000.0;
            Some(*acc)
        })
        .collect();
    let start = times[0];
    let span = times[times.len() - 1] - start;
    let n = (span * fs).floor() as usize + 1;
    let mut out = Vec::with_capacity(n);
    let mut idx = 0;
    for i in 0..n {
        let t = start + i as f64 / fs;
        while idx + 2 < times.len() && times[idx + 1] < t {
            idx += 1;
        }
        let (t0, t1) = (times[idx], times[idx + 1]);
        let (v0, v1) = (rr.rr[idx], rr.rr[idx + 1]);
        let frac = if t1 > t0 {
            ((t - t0) / (t1 - t0)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(v0 + (v1 - v0) * frac);
    }
    let m = mean(&out);
    out.iter_mut().for_each(|v| *v -= m);
    out
}

fn hann(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::intervals_to_peaks;

    fn rr_series() -> RRSeries {
        let data = [
            820.0, 780.0, 800.0, 790.0, 830.0, 770.0, 840.0, 880.0, 860.0, 810.0, 790.0, 820.0,
            850.0, 780.0, 800.0, 790.0, 830.0, 840.0, 820.0, 810.0,
        ];
        RRSeries { rr: data.to_vec() }
    }

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    #[test]
    fn time_domain_on_constant_rhythm() {
        let rr = RRSeries {
            rr: vec![800.0; 10],
        };
        let t = hrv_time(&rr);
        assert_eq!(t.n, 10);
        assert_close(t.mean_nn, 800.0, 1e-9);
        assert_close(t.sdnn, 0.0, 1e-9);
        assert_close(t.rmssd, 0.0, 1e-9);
        assert_close(t.pnn50, 0.0, 1e-9);
        assert_close(t.median_nn, 800.0, 1e-9);
        assert_close(t.iqr_nn, 0.0, 1e-9);
    }

    #[test]
    fn time_domain_on_alternating_rhythm() {
        let rr = RRSeries {
            rr: vec![700.0, 800.0, 700.0, 800.0, 700.0],
        };
        let t = hrv_time(&rr);
        assert_close(t.mean_nn, 740.0, 1e-9);
        assert_close(t.rmssd, 100.0, 1e-9);
        assert_close(t.pnn50, 100.0, 1e-9);
        assert_close(t.pnn20, 100.0, 1e-9);
        assert_close(t.min_nn, 700.0, 1e-9);
        assert_close(t.max_nn, 800.0, 1e-9);
        assert_close(t.median_nn, 700.0, 1e-9);
    }

    #[test]
    fn quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_close(quantile(&sorted, 0.5), 2.5, 1e-12);
        assert_close(quantile(&sorted, 0.25), 1.75, 1e-12);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn psd_bands_are_non_negative() {
        let psd = hrv_psd(&rr_series(), 4.0);
        assert!(psd.vlf >= 0.0);
        assert!(psd.lf >= 0.0);
        assert!(psd.hf >= 0.0);
        assert_close(psd.total_power, psd.vlf + psd.lf + psd.hf, 1e-9);
    }

    #[test]
    fn psd_of_too_short_series_is_empty() {
        let psd = hrv_psd(&RRSeries { rr: vec![800.0] }, 4.0);
        assert_eq!(psd.total_power, 0.0);
        assert!(psd.lf_hf.is_nan());
    }

    #[test]
    fn poincare_descriptors_are_consistent() {
        let metrics = hrv_nonlinear(&rr_series());
        assert!(metrics.sd1 > 0.0);
        assert!(metrics.sd2 > 0.0);
        assert_close(metrics.sd1_sd2, metrics.sd1 / metrics.sd2, 1e-12);
        assert_close(metrics.csi, metrics.sd2 / metrics.sd1, 1e-12);
        assert_close(metrics.ellipse_area, PI * metrics.sd1 * metrics.sd2, 1e-9);
        assert!(metrics.dfa_alpha1.is_finite());
    }

    #[test]
    fn sample_entropy_of_periodic_signal_is_low() {
        let periodic: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 1.0 } else { 2.0 }).collect();
        let value = sample_entropy(&periodic, 2, 0.2);
        assert_close(value, 0.0, 1e-9);
    }

    #[test]
    fn features_reject_short_windows() {
        let peaks = Events::from_indices(vec![0, 800]);
        assert_eq!(
            hrv_features(&peaks, 1000.0, 4.0),
            Err(HrvError::TooFewBeats {
                found: 2,
                required: MIN_PEAKS
            })
        );
        assert_eq!(
            hrv_features(&Events::from_indices(vec![]), 1000.0, 4.0),
            Err(HrvError::NoPeaks)
        );
        assert_eq!(
            hrv_features(&Events::from_indices(vec![0, 1, 2]), 0.0, 4.0),
            Err(HrvError::InvalidSamplingRate(0.0))
        );
    }

    #[test]
    fn features_are_named_and_ordered() {
        let peaks = intervals_to_peaks(&rr_series().rr, 1000.0);
        let features = hrv_features(&peaks, 1000.0, 4.0).expect("features");
        let names: Vec<&str> = features.names().collect();
        assert_eq!(names[0], "HRV_MeanNN");
        assert_eq!(names.last().copied(), Some("HRV_DFA_alpha1"));
        assert_close(features.get("HRV_MeanNN").unwrap(), 815.5, 1e-9);
    }

    #[test]
    fn oversized_interval_is_rejected() {
        let peaks = intervals_to_peaks(&[800.0, 810.0, 1e12, 790.0, 800.0], 1000.0);
        assert_eq!(
            hrv_features(&peaks, 1000.0, 4.0),
            Err(HrvError::ImplausibleInterval(1e12))
        );
        let peaks = intervals_to_peaks(&[800.0, 1e20, 790.0], 1000.0);
        assert!(matches!(
            hrv_features(&peaks, 1000.0, 4.0),
            Err(HrvError::ImplausibleInterval(_))
        ));
    }
}
