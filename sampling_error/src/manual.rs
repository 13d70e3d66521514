/*!

This is the long-form manual for `sampling_error` and `surveycheck`.

## Margin of error

For a sample of `n` respondents drawn from a universe of `N` elements, the
margin of error of a proportion `p` at a confidence level with critical value
`Z` is:

```text
E  = Z * sqrt(p * (1 - p) / n)
FC = sqrt((N - n) / (N - 1))
E' = E * FC
```

`E'` is the margin with the finite population correction. It is never larger
than `E`, and it is zero when the whole universe answered (`n = N`).

The critical values are:

| confidence | Z     |
|------------|-------|
| 90%        | 1.645 |
| 95%        | 1.96  |
| 99%        | 2.576 |

Any other confidence level uses `Z = 1.96`. This is not an error.

`p = 0.5` is the most conservative choice: it gives the largest margin.

The response rate is `n / N * 100`.

## Invalid designs

* a universe of 0 or 1 element (`N - 1` would be zero)
* an empty sample, or a sample larger than the universe
* a proportion outside of the open interval `(0, 1)`

## Configuration

`surveycheck` reads a JSON configuration with the `--config` flag. All the
fields are optional, except for the data source path:

```json
{
  "outputSettings": { "studyName": "Customer satisfaction 2025" },
  "dataSources": [{ "provider": "csv", "filePath": "datos.csv", "delimiter": ";" }],
  "datasheet": {
    "universeTotal": 24067,
    "sampleSize": 1445,
    "confidenceLevel": 0.95,
    "reportedMarginOfError": 2.5,
    "responseRate": 6
  },
  "segmentColumn": "SEGMENTO",
  "metrics": [
    {
      "name": "Information clarity",
      "columnFragments": ["información suministrada", "clara y fácil"]
    }
  ],
  "period": {
    "column": "DATE_MODIFIED",
    "expectedStart": "2025-04-15",
    "expectedEnd": "2025-06-01"
  },
  "sourceChecks": [
    {
      "filePath": "src/data/questionsMap.ts",
      "fields": { "sampleSize": "1445", "confidenceLevel": "95%" },
      "literals": [{ "text": "Satisfacción General" }]
    }
  ]
}
```

Relative paths are resolved against the directory of the configuration file.

### Providers

* `csv` delimited text, with a header row. The delimiter defaults to `;`.
* `xlsx` Excel workbook. The first worksheet is used unless
  `excelWorksheetName` is given.

### Verdicts

* datasheet: the corrected margin differs from the reported one by less than
  0.1 point (correct), less than 0.5 point (slight difference), or more.
* metrics: at least 70% of the ratings at the high threshold or above is a
  high satisfaction, at most 30% a low one. The mean gives the status:
  excellent from 4.0, good from 3.5, fair from 3.0, critical below. A scale
  (`minValue` to `maxValue`, 1 to 5 by default) has at most 101 ratings.
* response rate: the computed rate, rounded to a whole percent, must be within
  0.5 point of the reported one.
* period: the first and last responses are compared with the expected dates;
  0 day (exact), 1 day (acceptable), 7 days (review) or more (critical).

*/
